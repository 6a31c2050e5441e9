//! Pre-filled intake form links, the payload of a book's QR code.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::schema::CatalogSchema;
use crate::status::{is_returned, LibraryEntry, LoanState, LoanStatus};

/// Percent-encoded `반납`, the "returned" choice on the form.
pub const RETURNED_TOKEN: &str = "%EB%B0%98%EB%82%A9";

/// Percent-encoded `대출`, the "on loan" choice. Overdue books use it too.
pub const ON_LOAN_TOKEN: &str = "%EB%8C%80%EC%B6%9C";

const ON_LOAN_WORDS: [&str; 6] = ["대출", "대여", "연체", "on loan", "overdue", "borrowed"];

/// The intake form and its field ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeForm {
    /// Form receiving loan and return entries.
    pub form_url: String,
    /// Form used to register a new book.
    pub add_book_url: String,
    pub code_field: String,
    pub title_field: String,
    pub author_field: String,
    pub status_field: String,
    pub renter_field: String,
}

impl Default for IntakeForm {
    fn default() -> Self {
        Self {
            form_url: "https://docs.google.com/forms/d/e/1FAIpQLSdGuoHeUW-37RFCBgMH7ZUNL0tt_yHQiIFMrif85mrV428Omg/viewform".to_string(),
            add_book_url: "https://docs.google.com/forms/d/e/1FAIpQLSdOFZRt4o-bw6UNmBB6JtdDQ6PR5f7eW0dpfIs8KwyUysL5ag/viewform".to_string(),
            code_field: "entry.32105598".to_string(),
            title_field: "entry.1234176416".to_string(),
            author_field: "entry.628826984".to_string(),
            status_field: "entry.12641564".to_string(),
            renter_field: "entry.615776096".to_string(),
        }
    }
}

/// Values pre-filled into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeFields {
    pub code: String,
    pub title: String,
    pub author: String,
    pub renter: String,
    /// Form token for the status choice; see [`status_token`].
    pub status_token: String,
}

impl IntakeFields {
    /// Fields of a catalog entry.
    pub fn from_entry(entry: &LibraryEntry, schema: &CatalogSchema) -> Self {
        let optional = |column: Option<usize>| column.map(|c| entry.cell(c).to_string()).unwrap_or_default();
        Self {
            code: entry.cell(schema.code).to_string(),
            title: optional(schema.title),
            author: optional(schema.author),
            renter: entry.cell(schema.borrower).to_string(),
            status_token: status_token(entry.status.as_ref(), entry.cell(schema.status)).to_string(),
        }
    }
}

/// Form token for a book's status: returned, on loan (including overdue),
/// or empty when neither applies.
pub fn status_token(status: Option<&LoanStatus>, raw: &str) -> &'static str {
    match status.map(|s| &s.state) {
        Some(LoanState::Returned) => return RETURNED_TOKEN,
        Some(LoanState::OnLoan { .. }) | Some(LoanState::Overdue { .. }) => return ON_LOAN_TOKEN,
        _ => {}
    }

    let lowered = raw.to_lowercase();
    if is_returned(raw) {
        RETURNED_TOKEN
    } else if ON_LOAN_WORDS.iter().any(|w| lowered.contains(w)) {
        ON_LOAN_TOKEN
    } else {
        ""
    }
}

/// Percent-encode like a browser's `encodeURIComponent` does for form values.
fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

impl IntakeForm {
    /// Form URL with every field pre-filled.
    pub fn link(&self, fields: &IntakeFields) -> String {
        let base = self.form_url.split('?').next().unwrap_or(&self.form_url);
        format!(
            "{}?usp=pp_url&{}={}&{}={}&{}={}&{}={}&{}={}",
            base,
            self.code_field,
            encode(&fields.code),
            self.title_field,
            encode(&fields.title),
            self.author_field,
            encode(&fields.author),
            self.renter_field,
            encode(&fields.renter),
            self.status_field,
            fields.status_token
        )
    }

    /// Pre-filled link for a catalog entry.
    pub fn link_for(&self, entry: &LibraryEntry, schema: &CatalogSchema) -> String {
        self.link(&IntakeFields::from_entry(entry, schema))
    }

    /// Link to the "add book" form.
    pub fn add_book_link(&self) -> &str {
        &self.add_book_url
    }
}
