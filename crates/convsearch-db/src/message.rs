use rusqlite::types::ValueRef;

use crate::timestamp::Timestamp;

/// Longest content rendered before truncation, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

const TRUNCATION_MARKER: &str = "...";
const UNKNOWN_ROLE: &str = "unknown";
const CONVERSATION_ID_PREFIX_CHARS: usize = 8;

/// One message row joined with its conversation, as read from the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedMessage {
    pub role: Option<String>,
    pub content: Option<String>,
    pub create_time: Timestamp,
    pub conversation_id: String,
    pub conversation_title: Option<String>,
}

impl ArchivedMessage {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            role: sql_text(row.get_ref(0)?),
            content: sql_text(row.get_ref(1)?),
            create_time: Timestamp::from_sql(row.get_ref(2)?),
            conversation_id: sql_text(row.get_ref(3)?).unwrap_or_default(),
            conversation_title: sql_text(row.get_ref(4)?),
        })
    }

    /// `[timestamp] role (conv: label)` followed by the content on the next line.
    pub fn render(&self) -> String {
        let role = self
            .role
            .as_deref()
            .filter(|role| !role.is_empty())
            .unwrap_or(UNKNOWN_ROLE);
        let content = truncate_content(self.content.as_deref().unwrap_or_default().trim());

        format!(
            "[{}] {role} (conv: {})\n{content}",
            self.create_time.display(),
            self.conversation_label()
        )
    }

    /// Trimmed title, or the leading characters of the conversation id.
    pub fn conversation_label(&self) -> String {
        self.conversation_title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.conversation_id
                    .chars()
                    .take(CONVERSATION_ID_PREFIX_CHARS)
                    .collect()
            })
    }
}

fn truncate_content(content: &str) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &content[..cut]),
        None => content.to_string(),
    }
}

/// Columns in an export are loosely typed; anything non-NULL reads as text.
fn sql_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
