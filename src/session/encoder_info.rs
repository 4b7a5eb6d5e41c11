use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{GapError, GapResult};

/// Introspection keys a front end can ask the AVI encoder about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncoderQuery {
    /// Name shown in encoder menus.
    MenuName,
    /// Default output file extension.
    FileExtension,
    /// One-line description.
    ShortDescription,
    /// Name of the parameter editing procedure.
    GuiProcName,
}

impl EncoderQuery {
    /// Every query key.
    pub const ALL: [EncoderQuery; 4] = [
        EncoderQuery::MenuName,
        EncoderQuery::FileExtension,
        EncoderQuery::ShortDescription,
        EncoderQuery::GuiProcName,
    ];

    /// Wire key of this query.
    pub fn key(self) -> &'static str {
        match self {
            EncoderQuery::MenuName => "menu_name",
            EncoderQuery::FileExtension => "video_extension",
            EncoderQuery::ShortDescription => "short_description",
            EncoderQuery::GuiProcName => "gui_proc",
        }
    }
}

impl fmt::Display for EncoderQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EncoderQuery {
    type Err = GapError;

    fn from_str(s: &str) -> GapResult<Self> {
        EncoderQuery::ALL
            .into_iter()
            .find(|q| q.key() == s.trim())
            .ok_or_else(|| GapError::validation(format!("unknown encoder query '{s}'")))
    }
}

/// Answer an introspection query for the AVI encoder.
pub fn query_avi_encoder(q: EncoderQuery) -> &'static str {
    match q {
        EncoderQuery::MenuName => "AVI1",
        EncoderQuery::FileExtension => ".avi",
        EncoderQuery::ShortDescription => {
            "AVI video encoder (JPEG, MJPG, PNG, RAW, RGB, XVID) with optional PCM audio"
        }
        EncoderQuery::GuiProcName => "gapenc-avi1-params",
    }
}
