use super::fields;
use crate::model::{Verdict, VerdictBreakdown};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerdictLabel {
    Yes,
    No,
    Idk,
}

impl VerdictLabel {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(VerdictLabel::Yes),
            "no" => Some(VerdictLabel::No),
            "idk" => Some(VerdictLabel::Idk),
            _ => None,
        }
    }
}

/// Items may be `{verdict, reason}` objects or bare strings. Every item is
/// kept, so the list length always matches the source list.
pub fn parse_verdicts(v: Option<&Value>) -> Vec<Verdict> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(_) => Verdict {
                verdict: fields::text(item.get("verdict")),
                reason: fields::text(item.get("reason")),
            },
            other => Verdict {
                verdict: fields::text(Some(other)),
                reason: String::new(),
            },
        })
        .collect()
}

pub fn breakdown(verdicts: &[Verdict]) -> VerdictBreakdown {
    let mut out = VerdictBreakdown {
        total: verdicts.len() as u32,
        ..VerdictBreakdown::default()
    };
    for v in verdicts {
        match VerdictLabel::parse(&v.verdict) {
            Some(VerdictLabel::Yes) => out.yes += 1,
            Some(VerdictLabel::No) => out.no += 1,
            Some(VerdictLabel::Idk) => out.idk += 1,
            None => {}
        }
    }
    out
}
