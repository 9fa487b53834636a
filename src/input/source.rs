//! Source (template) document input definitions.

/// An open template document, tracked by salsa so token scans are memoized per revision.
#[salsa::input]
pub struct SourceFile {
    #[returns(ref)]
    pub uri: String,

    #[returns(ref)]
    pub text: String,
}
