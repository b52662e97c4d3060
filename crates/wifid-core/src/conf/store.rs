// ── hostapd-style config store ──
//
// Ordered `key=value` sections: one header section, then one section per
// `interface=` line and one per subordinate `bss=` line. Loaded fresh for
// every edit and written back atomically; never kept resident.
//
// Values are stored unescaped. On disk a backslash is `\\`, a newline is
// `\n` and a carriage return is `\r`, so every value fits on one line.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;

use indexmap::IndexMap;
use wifid_ctrl::MacAddress;

use super::atomic_write;
use crate::error::CoreError;

pub const INTERFACE_KEY: &str = "interface";
pub const BSS_KEY: &str = "bss";
/// Per-section key holding the hardware address.
pub const ADDRESS_KEY: &str = "bssid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Header,
    Interface,
    Bss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    /// Value of the section's `interface=` / `bss=` marker; `None` for the header.
    pub name: Option<String>,
    pub params: IndexMap<String, String>,
}

impl Section {
    fn header() -> Self {
        Self {
            kind: SectionKind::Header,
            name: None,
            params: IndexMap::new(),
        }
    }

    fn named(kind: SectionKind, marker: &str, name: &str) -> Self {
        let mut params = IndexMap::new();
        params.insert(marker.to_owned(), name.to_owned());
        Self {
            kind,
            name: Some(name.to_owned()),
            params,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Stored hardware address, if present and well-formed.
    pub fn address(&self) -> Option<MacAddress> {
        self.get(ADDRESS_KEY).and_then(|raw| MacAddress::parse(raw).ok())
    }
}

/// Which section an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKey<'a> {
    Header,
    Name(&'a str),
    Address(&'a MacAddress),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    /// `sections[0]` is always the header.
    sections: Vec<Section>,
    had_interface: bool,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Empty store with only a header section.
    pub fn new() -> Self {
        Self {
            sections: vec![Section::header()],
            had_interface: false,
        }
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let store = Self::parse(&text);
        tracing::debug!(
            path = %path.display(),
            sections = store.sections.len(),
            "loaded config"
        );
        Ok(store)
    }

    /// Parse file contents. Lines without `=` are skipped with a warning.
    /// Escapes in values are undone.
    pub fn parse(text: &str) -> Self {
        let mut store = Self::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!(line = lineno + 1, content = line, "skipping config line without '='");
                continue;
            };
            let value = unescape(value);
            match key {
                INTERFACE_KEY => {
                    store.had_interface = true;
                    store
                        .sections
                        .push(Section::named(SectionKind::Interface, INTERFACE_KEY, &value));
                }
                BSS_KEY => {
                    store.had_interface = true;
                    store
                        .sections
                        .push(Section::named(SectionKind::Bss, BSS_KEY, &value));
                }
                _ => {
                    if let Some(section) = store.sections.last_mut() {
                        section.params.insert(key.to_owned(), value);
                    }
                }
            }
        }
        store
    }

    /// The file declared at least one `interface=` or `bss=` section.
    pub fn had_interface_section(&self) -> bool {
        self.had_interface
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn header(&self) -> &Section {
        &self.sections[0]
    }

    pub fn section(&self, key: SectionKey<'_>) -> Option<&Section> {
        self.position(key).and_then(|i| self.sections.get(i))
    }

    fn position(&self, key: SectionKey<'_>) -> Option<usize> {
        match key {
            SectionKey::Header => Some(0),
            SectionKey::Name(name) => self
                .sections
                .iter()
                .position(|s| s.kind != SectionKind::Header && s.name.as_deref() == Some(name)),
            SectionKey::Address(mac) => self
                .sections
                .iter()
                .position(|s| s.address().as_ref() == Some(mac)),
        }
    }

    pub fn lookup_by_name(&self, section: &str, key: &str) -> Option<&str> {
        self.section(SectionKey::Name(section))?.get(key)
    }

    /// First section whose `bssid` matches wins.
    pub fn lookup_by_address(&self, hw_addr: &MacAddress, key: &str) -> Option<&str> {
        self.section(SectionKey::Address(hw_addr))?.get(key)
    }

    pub fn get(&self, section: SectionKey<'_>, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    /// Set `key` in an existing section. Returns the previous value.
    pub fn set(&mut self, section: SectionKey<'_>, key: &str, value: &str) -> Result<Option<String>, CoreError> {
        check_key(key)?;
        let index = self
            .position(section)
            .ok_or_else(|| CoreError::not_found("config section", describe(section)))?;
        Ok(self.sections[index]
            .params
            .insert(key.to_owned(), value.to_owned()))
    }

    /// Remove `key`, keeping the order of the remaining keys.
    pub fn remove(&mut self, section: SectionKey<'_>, key: &str) -> Option<String> {
        let index = self.position(section)?;
        self.sections[index].params.shift_remove(key)
    }

    /// Append an `interface=<name>` section.
    pub fn add_interface(&mut self, name: &str) -> &mut Section {
        self.had_interface = true;
        self.push_section(Section::named(SectionKind::Interface, INTERFACE_KEY, name))
    }

    /// Append a `bss=<name>` section.
    pub fn add_bss(&mut self, name: &str) -> &mut Section {
        self.had_interface = true;
        self.push_section(Section::named(SectionKind::Bss, BSS_KEY, name))
    }

    fn push_section(&mut self, section: Section) -> &mut Section {
        self.sections.push(section);
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    /// Header first, then every section in order, values escaped.
    ///
    /// Fails only on a key that cannot be written back, which `set` never
    /// lets in but direct edits of [`Section::params`] can.
    pub fn render(&self) -> Result<String, CoreError> {
        let mut out = String::new();
        for section in &self.sections {
            for (key, value) in &section.params {
                check_key(key)?;
                let _ = writeln!(out, "{key}={}", escape(value));
            }
        }
        Ok(out)
    }

    /// Write via temp file + rename; the destination is untouched on failure.
    pub fn write(&self, path: &Path) -> Result<(), CoreError> {
        let contents = self.render()?;
        atomic_write(path, contents.as_bytes())?;
        tracing::debug!(path = %path.display(), "wrote config");
        Ok(())
    }
}

fn check_key(key: &str) -> Result<(), CoreError> {
    if key.is_empty() || key.contains(['=', '\n', '\r']) {
        return Err(CoreError::InvalidArgument {
            field: "key".into(),
            reason: format!("'{}' is not a valid parameter name", key.escape_debug()),
        });
    }
    Ok(())
}

fn escape(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '\n', '\r']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Undo [`escape`]. Unknown escapes and a trailing backslash stay as written.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn describe(key: SectionKey<'_>) -> String {
    match key {
        SectionKey::Header => "header".into(),
        SectionKey::Name(name) => name.into(),
        SectionKey::Address(mac) => mac.to_string(),
    }
}
