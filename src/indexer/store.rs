//! In-memory index of resource files.

use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
};
use std::path::{
    Path,
    PathBuf,
};

use crate::input::resource::{
    ResourceFile,
    locale_for_check,
};

/// Map from resource file path to its parsed table.
///
/// Iteration follows lexicographic path order, which decides the winner
/// when the same key is defined by several files of one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIndex {
    files: BTreeMap<PathBuf, ResourceFile>,
}

impl ResourceIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&ResourceFile> {
        self.files.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &ResourceFile> {
        self.files.values()
    }

    /// Adds or replaces the file at its path.
    ///
    /// Returns the file's locale tag if no other file carried it before.
    /// The base locale (empty tag) is never reported.
    pub fn insert(&mut self, file: ResourceFile) -> Option<String> {
        let tag = file.locale_tag().to_string();
        let path = file.path().to_path_buf();
        let is_new_tag = !tag.is_empty() && !self.has_tag_except(&tag, &path);

        self.files.insert(path, file);
        is_new_tag.then_some(tag)
    }

    /// Removes the file at `path`.
    ///
    /// Returns the file's locale tag if it was the last file carrying it.
    pub fn remove(&mut self, path: &Path) -> Option<String> {
        let removed = self.files.remove(path)?;
        let tag = removed.locale_tag();

        (!tag.is_empty() && !self.has_tag_except(tag, path)).then(|| tag.to_string())
    }

    /// Upserts one entry in memory, creating an empty file record if needed.
    ///
    /// Returns a newly seen locale tag, as [`Self::insert`] does.
    pub fn add_entry(&mut self, path: &Path, key: &str, value: &str) -> Option<String> {
        if let Some(file) = self.files.get_mut(path) {
            file.insert(key.to_string(), value.to_string());
            return None;
        }

        let mut file = ResourceFile::new(path.to_path_buf(), HashMap::new());
        file.insert(key.to_string(), value.to_string());
        self.insert(file)
    }

    /// Value of `key` from the first file of `locale`, `"D"` meaning the base files.
    ///
    /// Files where the key has an empty value are skipped.
    #[must_use]
    pub fn lookup(&self, key: &str, locale: &str) -> Option<&str> {
        let locale = locale_for_check(locale);
        self.files_of(locale).find_map(|file| file.get(key).filter(|value| !value.is_empty()))
    }

    #[must_use]
    pub fn contains_key(&self, key: &str, locale: &str) -> bool {
        self.lookup(key, locale).is_some()
    }

    /// First key, in index order, whose value equals `value` in any file.
    ///
    /// Within one file the smallest matching key wins, so the answer does not
    /// depend on hash order.
    #[must_use]
    pub fn find_key_by_value(&self, value: &str) -> Option<&str> {
        self.files.values().find_map(|file| {
            file.entries()
                .iter()
                .filter(|(_, candidate)| candidate.as_str() == value)
                .map(|(key, _)| key.as_str())
                .min()
        })
    }

    #[must_use]
    pub fn files_for_locale(&self, locale: &str) -> Vec<PathBuf> {
        self.files_of(locale_for_check(locale)).map(|file| file.path().to_path_buf()).collect()
    }

    /// Path of the first indexed file.
    #[must_use]
    pub fn first_path(&self) -> Option<&Path> {
        self.files.keys().next().map(PathBuf::as_path)
    }

    /// Distinct non-empty locale tags.
    #[must_use]
    pub fn locale_tags(&self) -> BTreeSet<String> {
        self.files
            .values()
            .map(ResourceFile::locale_tag)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn files_of<'a, 'b>(
        &'a self,
        locale: &'b str,
    ) -> impl Iterator<Item = &'a ResourceFile> + use<'a, 'b> {
        self.files.values().filter(move |file| file.locale() == locale)
    }

    fn has_tag_except(&self, tag: &str, path: &Path) -> bool {
        self.files.iter().any(|(other, file)| other != path && file.locale_tag() == tag)
    }
}

impl FromIterator<ResourceFile> for ResourceIndex {
    fn from_iter<I: IntoIterator<Item = ResourceFile>>(iter: I) -> Self {
        let files = iter.into_iter().map(|file| (file.path().to_path_buf(), file)).collect();
        Self { files }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    fn file(path: &str, entries: &[(&str, &str)]) -> ResourceFile {
        ResourceFile::new(
            PathBuf::from(path),
            entries.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        )
    }

    #[fixture]
    fn index() -> ResourceIndex {
        [
            file("/i18n/messages.properties", &[("greeting", "Hello"), ("bye", "Bye")]),
            file("/i18n/messages_fr.properties", &[("greeting", "Bonjour")]),
            file("/i18n/other_fr.properties", &[("greeting", "Salut"), ("bye", "Au revoir")]),
        ]
        .into_iter()
        .collect()
    }

    #[rstest]
    #[case::base("greeting", "D", Some("Hello"))]
    #[case::empty_tag_means_base("greeting", "", Some("Hello"))]
    #[case::first_path_wins("greeting", "fr", Some("Bonjour"))]
    #[case::later_file_fills_gap("bye", "fr", Some("Au revoir"))]
    #[case::unknown_key("missing", "D", None)]
    #[case::unknown_locale("greeting", "de", None)]
    fn lookup_by_locale(
        index: ResourceIndex,
        #[case] key: &str,
        #[case] locale: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(index.lookup(key, locale), expected);
    }

    #[rstest]
    #[googletest::test]
    fn empty_value_falls_through_to_next_file(mut index: ResourceIndex) {
        index.insert(file("/i18n/messages_fr.properties", &[("greeting", "")]));
        index.insert(file("/i18n/messages.properties", &[("blank", "")]));

        expect_that!(index.lookup("greeting", "fr"), some(eq("Salut")));
        expect_that!(index.lookup("blank", "D"), none());
    }

    #[rstest]
    #[googletest::test]
    fn insert_reports_only_first_file_of_a_tag(mut index: ResourceIndex) {
        expect_that!(index.insert(file("/i18n/messages_de.properties", &[])), some(eq("de")));
        expect_that!(index.insert(file("/i18n/more_de.properties", &[])), none());
        expect_that!(index.insert(file("/i18n/more.properties", &[])), none());
    }

    #[rstest]
    #[googletest::test]
    fn reinserting_same_path_replaces_entries(mut index: ResourceIndex) {
        let result = index.insert(file("/i18n/messages_fr.properties", &[("new", "Nouveau")]));

        expect_that!(result, none());
        expect_that!(index.len(), eq(3));
        expect_that!(index.lookup("new", "fr"), some(eq("Nouveau")));
        expect_that!(index.lookup("greeting", "fr"), some(eq("Salut")));
    }

    #[rstest]
    #[googletest::test]
    fn remove_reports_vanished_tag_with_last_file(mut index: ResourceIndex) {
        expect_that!(index.remove(Path::new("/i18n/messages_fr.properties")), none());
        expect_that!(index.remove(Path::new("/i18n/other_fr.properties")), some(eq("fr")));
        expect_that!(index.remove(Path::new("/i18n/messages.properties")), none());
        expect_that!(index.remove(Path::new("/i18n/unknown.properties")), none());
        expect_that!(index.is_empty(), eq(true));
    }

    #[rstest]
    #[googletest::test]
    fn add_entry_updates_existing_file(mut index: ResourceIndex) {
        let result = index.add_entry(Path::new("/i18n/messages.properties"), "title", "Title");

        expect_that!(result, none());
        expect_that!(index.lookup("title", "D"), some(eq("Title")));
    }

    #[rstest]
    #[googletest::test]
    fn add_entry_creates_missing_file(mut index: ResourceIndex) {
        let result = index.add_entry(Path::new("/i18n/messages_es.properties"), "hola", "Hola");

        expect_that!(result, some(eq("es")));
        expect_that!(index.lookup("hola", "es"), some(eq("Hola")));
    }

    #[rstest]
    #[googletest::test]
    fn find_key_by_value_searches_all_locales(index: ResourceIndex) {
        expect_that!(index.find_key_by_value("Bye"), some(eq("bye")));
        expect_that!(index.find_key_by_value("Salut"), some(eq("greeting")));
        expect_that!(index.find_key_by_value("Nope"), none());
    }

    #[rstest]
    #[googletest::test]
    fn files_for_locale_in_path_order(index: ResourceIndex) {
        expect_that!(
            index.files_for_locale("fr"),
            elements_are![
                eq(&PathBuf::from("/i18n/messages_fr.properties")),
                eq(&PathBuf::from("/i18n/other_fr.properties"))
            ]
        );
        expect_that!(index.files_for_locale("D"), len(eq(1)));
        expect_that!(index.contains_key("bye", "D"), eq(true));
        expect_that!(index.contains_key("bye", "de"), eq(false));
    }

    #[rstest]
    #[googletest::test]
    fn locale_tags_skip_base(index: ResourceIndex) {
        let tags: Vec<String> = index.locale_tags().into_iter().collect();

        expect_that!(tags, elements_are![eq("fr")]);
        expect_that!(index.first_path(), some(eq(Path::new("/i18n/messages.properties"))));
    }
}
