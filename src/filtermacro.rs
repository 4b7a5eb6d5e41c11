use std::path::Path;

use crate::foundation::error::{GapError, GapResult};
use crate::settings::SettingsStore;
use crate::util::file::{read_file, write_file};
use crate::util::hex::decode_hex;

/// First line of every filter macro file (prefix match).
pub const FMAC_HEADER: &str = "# FILTERMACRO FILE";

/// One recorded filter call: the plug-in name and its settings blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterMacroEntry {
    /// Plug-in (settings) name.
    pub plugin: String,
    /// Recorded settings bytes.
    pub data: Vec<u8>,
}

/// A filter macro: an ordered list of recorded settings blobs.
///
/// Text form:
///
/// ```text
/// # FILTERMACRO FILE
/// "plug-in-blur" 4 00 00 a0 40
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterMacro {
    entries: Vec<FilterMacroEntry>,
}

impl FilterMacro {
    /// Empty macro.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded entries in file order.
    pub fn entries(&self) -> &[FilterMacroEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry.
    pub fn push(&mut self, plugin: impl Into<String>, data: Vec<u8>) -> GapResult<()> {
        let plugin = plugin.into();
        if plugin.is_empty() || plugin.contains(['"', '\n', '\r']) {
            return Err(GapError::validation(format!(
                "invalid filter macro plug-in name {plugin:?}"
            )));
        }
        self.entries.push(FilterMacroEntry { plugin, data });
        Ok(())
    }

    /// Parse the text form.
    pub fn parse(text: &str) -> GapResult<Self> {
        let mut lines = text.lines().enumerate();
        match lines.next() {
            Some((_, first)) if first.starts_with(FMAC_HEADER) => {}
            _ => {
                return Err(GapError::format(format!(
                    "missing '{FMAC_HEADER}' header line"
                )));
            }
        }

        let mut fmac = Self::new();
        for (idx, line) in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = parse_line(line)
                .map_err(|msg| GapError::format(format!("line {}: {msg}", idx + 1)))?;
            fmac.entries.push(entry);
        }
        Ok(fmac)
    }

    /// Read and parse a macro file.
    pub fn load(path: &Path) -> GapResult<Self> {
        let bytes = read_file(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| GapError::format(format!("'{}' is not UTF-8 text", path.display())))?;
        Self::parse(&text).map_err(|e| match e {
            GapError::Format(msg) => GapError::format(format!("'{}': {msg}", path.display())),
            other => other,
        })
    }

    /// Render the text form.
    pub fn to_text(&self) -> String {
        let mut out = String::from(FMAC_HEADER);
        out.push('\n');
        for e in &self.entries {
            out.push('"');
            out.push_str(&e.plugin);
            out.push_str("\" ");
            out.push_str(&e.data.len().to_string());
            for b in &e.data {
                out.push_str(&format!(" {b:02x}"));
            }
            out.push('\n');
        }
        out
    }

    /// Write the text form to `path`.
    pub fn save(&self, path: &Path) -> GapResult<()> {
        write_file(path, self.to_text().as_bytes())
    }

    /// Install every recorded blob into `store`.
    ///
    /// When the store already holds a blob of a different size for any entry, nothing is applied
    /// and a format error is returned. Returns the number of entries applied.
    pub fn apply_to(&self, store: &mut SettingsStore) -> GapResult<usize> {
        for e in &self.entries {
            if let Some(current) = store.size_of(&e.plugin)
                && current != e.data.len()
            {
                return Err(GapError::format(format!(
                    "settings size mismatch for '{}': macro has {} bytes, current settings {}",
                    e.plugin,
                    e.data.len(),
                    current
                )));
            }
        }
        for e in &self.entries {
            store.set(e.plugin.clone(), e.data.clone());
        }
        tracing::debug!(entries = self.entries.len(), "filter macro applied");
        Ok(self.entries.len())
    }

    /// Capture the current blobs of `names` from `store`.
    pub fn record_from<'a>(
        store: &SettingsStore,
        names: impl IntoIterator<Item = &'a str>,
    ) -> GapResult<Self> {
        let mut fmac = Self::new();
        for name in names {
            let data = store.get(name).ok_or_else(|| {
                GapError::validation(format!("no stored settings for '{name}'"))
            })?;
            fmac.push(name, data.to_vec())?;
        }
        Ok(fmac)
    }
}

fn parse_line(line: &str) -> Result<FilterMacroEntry, String> {
    let rest = line
        .strip_prefix('"')
        .ok_or("expected a quoted plug-in name")?;
    let (plugin, rest) = rest
        .split_once('"')
        .ok_or("unterminated plug-in name")?;
    if plugin.is_empty() {
        return Err("empty plug-in name".to_string());
    }

    let rest = rest.trim_start();
    let (len_text, hex) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let len: usize = len_text
        .parse()
        .map_err(|_| format!("invalid length '{len_text}'"))?;
    let data = decode_hex(hex).map_err(|e| e.to_string())?;
    if data.len() != len {
        return Err(format!(
            "'{plugin}' declares {len} bytes but holds {}",
            data.len()
        ));
    }
    Ok(FilterMacroEntry {
        plugin: plugin.to_string(),
        data,
    })
}

#[cfg(test)]
#[path = "../tests/unit/filtermacro.rs"]
mod tests;
