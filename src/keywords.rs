// Status keyword matching.
//
// Inspection sheets are filled in by hand, so judgement and disposition
// columns hold free text rather than a closed set of codes. A status is
// recognised when the (already uppercased) text *contains* one of the
// category's keywords. Category order matters wherever a single category has
// to be chosen: OK is tried before NG, PASS before RETURN before SPECIAL.
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCategory {
    Ok,
    Ng,
    Pass,
    Return,
    Special,
}

pub const OK_KEYWORDS: &[&str] = &["OK", "合格"];
pub const NG_KEYWORDS: &[&str] = &["NG", "不合格", "不良"];
pub const PASS_KEYWORDS: &[&str] = &["正常入库", "合格", "PASS", "入"];
pub const RETURN_KEYWORDS: &[&str] = &["退货", "RETURN", "退"];
pub const SPECIAL_KEYWORDS: &[&str] = &["特采", "SPECIAL", "特许", "让步", "生产领用"];

/// Judgement categories in priority order.
pub const RESULT_CATEGORIES: &[StatusCategory] = &[StatusCategory::Ok, StatusCategory::Ng];

/// Disposition categories in priority order.
pub const ACTION_CATEGORIES: &[StatusCategory] = &[
    StatusCategory::Pass,
    StatusCategory::Return,
    StatusCategory::Special,
];

impl StatusCategory {
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            StatusCategory::Ok => OK_KEYWORDS,
            StatusCategory::Ng => NG_KEYWORDS,
            StatusCategory::Pass => PASS_KEYWORDS,
            StatusCategory::Return => RETURN_KEYWORDS,
            StatusCategory::Special => SPECIAL_KEYWORDS,
        }
    }
}

/// Membership test: does `text` contain any keyword of `category`?
///
/// Empty text never matches.
pub fn matches(text: &str, category: StatusCategory) -> bool {
    if text.is_empty() {
        return false;
    }
    category.keywords().iter().any(|kw| text.contains(kw))
}

/// First category (in the given order) whose keywords occur in `text`, or
/// `None` when the text is unrecognised.
pub fn classify_status(text: &str, categories: &[StatusCategory]) -> Option<StatusCategory> {
    categories.iter().copied().find(|c| matches(text, *c))
}

pub fn classify_result(text: &str) -> Option<StatusCategory> {
    classify_status(text, RESULT_CATEGORIES)
}

pub fn classify_action(text: &str) -> Option<StatusCategory> {
    classify_status(text, ACTION_CATEGORIES)
}
