use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical pipeline stages, in the order a job passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Metadata,
    Resolve,
    Download,
    Remux,
    Tagging,
    Saved,
}

impl Stage {
    pub const COUNT: usize = 6;
    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Metadata,
        Stage::Resolve,
        Stage::Download,
        Stage::Remux,
        Stage::Tagging,
        Stage::Saved,
    ];
    pub const LAST: Stage = Stage::Saved;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    /// The stage before this one, if any.
    pub fn prev(self) -> Option<Stage> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// The stage after this one, if any.
    pub fn next(self) -> Option<Stage> {
        Self::from_index(self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Metadata => "Metadata",
            Stage::Resolve => "Resolve",
            Stage::Download => "Download",
            Stage::Remux => "Remux",
            Stage::Tagging => "Tagging",
            Stage::Saved => "Saved",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy)]
enum Match {
    Prefix,
    Contains,
}

struct Rule {
    stage: Stage,
    kind: Match,
    needles: &'static [&'static str],
}

impl Rule {
    fn matches(&self, label: &str) -> bool {
        self.needles.iter().any(|needle| match self.kind {
            Match::Prefix => label.starts_with(needle),
            Match::Contains => label.contains(needle),
        })
    }
}

// Order matters: first match wins. "write metadata" is a post-download
// write and must be checked before the generic metadata rule.
const RULES: &[Rule] = &[
    Rule {
        stage: Stage::Remux,
        kind: Match::Contains,
        needles: &["write metadata", "writing metadata"],
    },
    Rule {
        stage: Stage::Metadata,
        kind: Match::Prefix,
        needles: &["metadata", "detect", "fetching metadata", "fetch metadata"],
    },
    Rule {
        stage: Stage::Resolve,
        kind: Match::Prefix,
        needles: &["resolv"],
    },
    Rule {
        stage: Stage::Download,
        kind: Match::Contains,
        needles: &[
            "video data",
            "audio data",
            "media data",
            "downloading video",
            "downloading audio",
            "downloading media",
        ],
    },
    Rule {
        stage: Stage::Download,
        kind: Match::Prefix,
        needles: &["download"],
    },
    Rule {
        stage: Stage::Remux,
        kind: Match::Contains,
        needles: &[
            "post-process",
            "postprocess",
            "post process",
            "remux",
            "merg",
            "extract",
            "convert",
            "fixup",
            "embed",
            "artwork",
            "thumbnail",
        ],
    },
    Rule {
        stage: Stage::Tagging,
        kind: Match::Prefix,
        needles: &["tag"],
    },
    Rule {
        stage: Stage::Saved,
        kind: Match::Prefix,
        needles: &["save", "saving"],
    },
];

/// Maps a raw pipeline label to its canonical stage.
///
/// Matching is case-insensitive and ignores surrounding whitespace. Labels
/// that match no rule (e.g. "Starting") yield `None`.
pub fn classify(label: &str) -> Option<Stage> {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        return None;
    }
    RULES
        .iter()
        .find(|rule| rule.matches(&label))
        .map(|rule| rule.stage)
}
