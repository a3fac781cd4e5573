//! Provisioning store: where directory entries live.
//!
//! The engine reads its user directory from XML files, one per user:
//!
//! ```xml
//! <include>
//!   <user id="2000">
//!     <params>
//!       <param name="password" value="secret"/>
//!     </params>
//!     <variables>
//!       <variable name="effective_caller_id_name" value="Front Desk"/>
//!     </variables>
//!   </user>
//! </include>
//! ```
//!
//! [`XmlDirectoryStore`] writes and reads those files under a root
//! directory. [`MemoryDirectoryStore`] keeps entries in a map and is used in
//! tests and offline runs.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use callstats_types::DirectoryEntry;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, warn};

use crate::error::CoreError;

/// Longest accepted user id.
pub const MAX_USER_ID_LEN: usize = 64;

/// Check a directory user id: non-empty, at most [`MAX_USER_ID_LEN`]
/// characters, only `[A-Za-z0-9_.-]`, and not starting with a dot.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] describing the problem.
pub fn validate_user_id(user_id: &str) -> Result<(), CoreError> {
    if user_id.is_empty() {
        return Err(CoreError::Validation(String::from("user_id is required")));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(CoreError::Validation(format!(
            "user_id must be at most {MAX_USER_ID_LEN} characters"
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');
    if !user_id.chars().all(allowed) || user_id.starts_with('.') {
        return Err(CoreError::Validation(format!(
            "user_id `{user_id}` may only contain [A-Za-z0-9_.-]"
        )));
    }
    Ok(())
}

/// Persistent storage of directory entries.
pub trait DirectoryStore: Send + Sync {
    /// Whether an entry exists for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the store cannot be queried.
    fn exists(&self, user_id: &str) -> Result<bool, CoreError>;

    /// Persist a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the user already exists and
    /// [`CoreError::Store`] if the entry cannot be written.
    fn write(&self, entry: &DirectoryEntry) -> Result<(), CoreError>;

    /// Load the entry for `user_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the entry exists but cannot be read.
    fn read(&self, user_id: &str) -> Result<Option<DirectoryEntry>, CoreError>;

    /// The display name of `user_id`, if the entry carries one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the entry exists but cannot be read.
    fn display_name(&self, user_id: &str) -> Result<Option<String>, CoreError> {
        Ok(self
            .read(user_id)?
            .and_then(|entry| entry.display_name().map(str::to_owned)))
    }
}

// ---------------------------------------------------------------------------
// XML files
// ---------------------------------------------------------------------------

/// One `<user_id>.xml` file per user under a root directory.
#[derive(Debug, Clone)]
pub struct XmlDirectoryStore {
    root: PathBuf,
}

impl XmlDirectoryStore {
    /// A store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, user_id: &str) -> Option<PathBuf> {
        validate_user_id(user_id).ok()?;
        Some(self.root.join(format!("{user_id}.xml")))
    }
}

impl DirectoryStore for XmlDirectoryStore {
    fn exists(&self, user_id: &str) -> Result<bool, CoreError> {
        let Some(path) = self.path_for(user_id) else {
            return Ok(false);
        };
        path.try_exists()
            .map_err(|e| CoreError::Store(format!("{}: {e}", path.display())))
    }

    fn write(&self, entry: &DirectoryEntry) -> Result<(), CoreError> {
        validate_user_id(&entry.user_id)?;
        let xml = render_directory_xml(entry)?;

        std::fs::create_dir_all(&self.root)
            .map_err(|e| CoreError::Store(format!("{}: {e}", self.root.display())))?;
        let path = self.root.join(format!("{}.xml", entry.user_id));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => CoreError::Validation(format!(
                    "user `{}` already exists",
                    entry.user_id
                )),
                _ => CoreError::Store(format!("{}: {e}", path.display())),
            })?;
        fill_or_remove(file, &path, |file| {
            file.write_all(xml.as_bytes())?;
            file.sync_all()
        })
        .map_err(|e| CoreError::Store(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), "directory entry written");
        Ok(())
    }

    fn read(&self, user_id: &str) -> Result<Option<DirectoryEntry>, CoreError> {
        let Some(path) = self.path_for(user_id) else {
            return Ok(None);
        };
        let xml = match std::fs::read_to_string(&path) {
            Ok(xml) => xml,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::Store(format!("{}: {e}", path.display()))),
        };
        parse_directory_xml(&xml).map(Some)
    }
}

/// Run `fill` on a freshly created file. If it fails the file is removed,
/// so a half-written entry never blocks a retry.
fn fill_or_remove<F>(mut file: File, path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let Err(e) = fill(&mut file) else {
        return Ok(());
    };
    drop(file);
    if let Err(cleanup) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %cleanup, "could not remove partial directory entry");
    }
    Err(e)
}

/// Run store calls on the blocking pool so file I/O never stalls the
/// async runtime.
///
/// # Errors
///
/// Returns whatever `task` returns, or [`CoreError::Store`] if the task
/// panicked or was cancelled.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T, CoreError>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CoreError::Store(format!("directory task failed: {e}")))?
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Entries held in a map.
#[derive(Debug, Default)]
pub struct MemoryDirectoryStore {
    entries: RwLock<BTreeMap<String, DirectoryEntry>>,
}

impl MemoryDirectoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `entries`.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = DirectoryEntry>,
    {
        let map = entries
            .into_iter()
            .map(|entry| (entry.user_id.clone(), entry))
            .collect();
        Self {
            entries: RwLock::new(map),
        }
    }
}

fn poisoned<T>(e: &PoisonError<T>) -> CoreError {
    CoreError::Store(format!("directory lock poisoned: {e}"))
}

impl DirectoryStore for MemoryDirectoryStore {
    fn exists(&self, user_id: &str) -> Result<bool, CoreError> {
        let entries = self.entries.read().map_err(|e| poisoned(&e))?;
        Ok(entries.contains_key(user_id))
    }

    fn write(&self, entry: &DirectoryEntry) -> Result<(), CoreError> {
        validate_user_id(&entry.user_id)?;
        let mut entries = self.entries.write().map_err(|e| poisoned(&e))?;
        if entries.contains_key(&entry.user_id) {
            return Err(CoreError::Validation(format!(
                "user `{}` already exists",
                entry.user_id
            )));
        }
        entries.insert(entry.user_id.clone(), entry.clone());
        Ok(())
    }

    fn read(&self, user_id: &str) -> Result<Option<DirectoryEntry>, CoreError> {
        let entries = self.entries.read().map_err(|e| poisoned(&e))?;
        Ok(entries.get(user_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// XML encoding
// ---------------------------------------------------------------------------

fn xml_err(e: &dyn std::fmt::Display) -> CoreError {
    CoreError::Store(format!("directory xml: {e}"))
}

/// Render an entry as the engine's directory XML.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if the document cannot be produced.
pub fn render_directory_xml(entry: &DirectoryEntry) -> Result<String, CoreError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Start(BytesStart::new("include")))
        .map_err(|e| xml_err(&e))?;

    let mut user = BytesStart::new("user");
    user.push_attribute(("id", entry.user_id.as_str()));
    writer.write_event(Event::Start(user)).map_err(|e| xml_err(&e))?;

    write_section(&mut writer, "params", "param", &entry.params)?;
    write_section(&mut writer, "variables", "variable", &entry.variables)?;

    writer
        .write_event(Event::End(BytesStart::new("user").to_end()))
        .map_err(|e| xml_err(&e))?;
    writer
        .write_event(Event::End(BytesStart::new("include").to_end()))
        .map_err(|e| xml_err(&e))?;

    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| xml_err(&e))
}

fn write_section(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    section: &str,
    element: &str,
    values: &BTreeMap<String, String>,
) -> Result<(), CoreError> {
    writer
        .write_event(Event::Start(BytesStart::new(section)))
        .map_err(|e| xml_err(&e))?;
    for (name, value) in values {
        let mut item = BytesStart::new(element);
        item.push_attribute(("name", name.as_str()));
        item.push_attribute(("value", value.as_str()));
        writer.write_event(Event::Empty(item)).map_err(|e| xml_err(&e))?;
    }
    writer
        .write_event(Event::End(BytesStart::new(section).to_end()))
        .map_err(|e| xml_err(&e))?;
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Params,
    Variables,
}

/// Parse a directory XML document back into an entry.
///
/// Unknown elements are ignored. A `<param>` or `<variable>` outside its
/// section is ignored too.
///
/// # Errors
///
/// Returns [`CoreError::Store`] if the XML is malformed or has no
/// `<user id="...">` element.
pub fn parse_directory_xml(xml: &str) -> Result<DirectoryEntry, CoreError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut user_id = None;
    let mut params = BTreeMap::new();
    let mut variables = BTreeMap::new();
    let mut section = Section::None;

    loop {
        match reader.read_event().map_err(|e| xml_err(&e))? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"user" => user_id = attribute(e, b"id")?,
                b"params" => section = Section::Params,
                b"variables" => section = Section::Variables,
                b"param" if section == Section::Params => {
                    if let Some((name, value)) = name_value(e)? {
                        params.insert(name, value);
                    }
                }
                b"variable" if section == Section::Variables => {
                    if let Some((name, value)) = name_value(e)? {
                        variables.insert(name, value);
                    }
                }
                _ => {}
            },
            Event::End(ref e) => {
                if matches!(e.name().as_ref(), b"params" | b"variables") {
                    section = Section::None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| xml_err(&"no <user id=\"...\"> element"))?;
    Ok(DirectoryEntry {
        user_id,
        params,
        variables,
    })
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, CoreError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_err(&e))?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(|e| xml_err(&e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn name_value(element: &BytesStart<'_>) -> Result<Option<(String, String)>, CoreError> {
    let Some(name) = attribute(element, b"name")? else {
        return Ok(None);
    };
    let value = attribute(element, b"value")?.unwrap_or_default();
    Ok(Some((name, value)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn entry(user_id: &str, name: &str) -> DirectoryEntry {
        let mut params = BTreeMap::new();
        params.insert(String::from("password"), String::from("p&ss<word>"));
        let mut variables = BTreeMap::new();
        variables.insert(String::from("effective_caller_id_name"), name.to_owned());
        variables.insert(
            String::from("outbound_caller_id_name"),
            String::from("$${outbound_caller_name}"),
        );
        DirectoryEntry {
            user_id: user_id.to_owned(),
            params,
            variables,
        }
    }

    fn temp_root(label: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "callstats-directory-{label}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        root
    }

    #[test]
    fn user_id_rules() {
        assert!(validate_user_id("2000").is_ok());
        assert!(validate_user_id("front.desk-1_a").is_ok());
        for bad in ["", "../etc/passwd", "a b", "a;b", ".hidden", "x/y"] {
            assert!(validate_user_id(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(validate_user_id(&"9".repeat(MAX_USER_ID_LEN + 1)).is_err());
    }

    #[test]
    fn xml_document_shape() {
        let xml = render_directory_xml(&entry("2000", "Front Desk")).unwrap();
        assert!(xml.trim_start().starts_with("<include>"));
        assert!(xml.contains("<user id=\"2000\">"));
        assert!(xml.contains("<param name=\"password\" value=\"p&amp;ss&lt;word&gt;\"/>"));
        assert!(xml.contains("<variable name=\"effective_caller_id_name\" value=\"Front Desk\"/>"));
        assert!(xml.contains("$${outbound_caller_name}"));
    }

    #[test]
    fn parses_hand_written_entries() {
        let xml = r#"<include>
  <user id="1000">
    <params>
      <param name="password" value="$${default_password}"/>
      <param name="vm-password" value="1000"/>
    </params>
    <variables>
      <variable name="directory_full_name" value="Ada Lovelace"></variable>
      <variable name="user_context" value="default"/>
    </variables>
  </user>
</include>"#;
        let parsed = parse_directory_xml(xml).unwrap();
        assert_eq!(parsed.user_id, "1000");
        assert_eq!(parsed.params.len(), 2);
        assert_eq!(parsed.display_name(), Some("Ada Lovelace"));
    }

    #[test]
    fn document_without_user_is_a_store_error() {
        let result = parse_directory_xml("<include></include>");
        assert!(matches!(result, Err(CoreError::Store(_))));
    }

    #[test]
    fn xml_store_writes_once_and_reads_back() {
        let root = temp_root("xml");
        let store = XmlDirectoryStore::new(&root);
        let original = entry("2000", "Front Desk");

        assert!(!store.exists("2000").unwrap());
        store.write(&original).unwrap();
        assert!(store.exists("2000").unwrap());
        assert_eq!(store.read("2000").unwrap(), Some(original.clone()));
        assert_eq!(
            store.display_name("2000").unwrap().as_deref(),
            Some("Front Desk")
        );

        let duplicate = store.write(&original).unwrap_err();
        assert!(duplicate.is_validation());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn failed_write_leaves_no_partial_entry() {
        let root = temp_root("partial");
        std::fs::create_dir_all(&root).unwrap();
        let store = XmlDirectoryStore::new(&root);
        let path = root.join("2000.xml");

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .unwrap();
        let result = fill_or_remove(file, &path, |file| {
            file.write_all(b"<include><user id=\"2000\">")?;
            Err(io::Error::other("no space left on device"))
        });
        assert!(result.is_err());
        assert!(!path.exists());
        assert!(!store.exists("2000").unwrap());

        store.write(&entry("2000", "Front Desk")).unwrap();
        assert_eq!(
            store.display_name("2000").unwrap().as_deref(),
            Some("Front Desk")
        );

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn blocking_task_errors_pass_through() {
        let ok = run_blocking(|| Ok(7)).await.unwrap();
        assert_eq!(ok, 7);

        let err = run_blocking(|| -> Result<(), CoreError> {
            Err(CoreError::Validation(String::from("nope")))
        })
        .await
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn xml_store_ignores_unsafe_ids_on_lookup() {
        let store = XmlDirectoryStore::new(temp_root("unsafe"));
        assert!(!store.exists("../passwd").unwrap());
        assert_eq!(store.read("../passwd").unwrap(), None);
        assert_eq!(store.display_name("1000@default").unwrap(), None);
    }

    #[test]
    fn memory_store_rejects_duplicates() {
        let store = MemoryDirectoryStore::with_entries([entry("1000", "Ada")]);
        assert!(store.exists("1000").unwrap());
        assert_eq!(store.display_name("1000").unwrap().as_deref(), Some("Ada"));
        assert!(store.write(&entry("1000", "Grace")).unwrap_err().is_validation());
        store.write(&entry("1001", "Grace")).unwrap();
        assert!(store.exists("1001").unwrap());
        assert_eq!(store.display_name("9999").unwrap(), None);
    }
}
