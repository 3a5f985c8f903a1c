//! FAQ import from spreadsheet exports

use csv::{ReaderBuilder, StringRecord, Trim};

use super::WorkflowContext;
use crate::client::{actions, ClientError, QueryKey};
use crate::models::FaqPair;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("Unsupported file type: {0}. Please upload a CSV or Excel file")]
    UnsupportedType(String),

    #[error("The file must contain a header row and at least one question")]
    TooFewLines,

    #[error("The header row must contain \"question\" and \"answer\" columns")]
    MissingHeader,

    #[error("No valid question and answer rows were found")]
    NoValidRows,

    #[error("Could not read the file: {0}")]
    Csv(String),
}

/// MIME check, ignoring parameters such as `; charset=utf-8`
pub fn is_allowed_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    ALLOWED_MIME_TYPES.contains(&essence.as_str())
}

/// Parse `question`/`answer` rows; columns are found by header name.
pub fn parse_faq_csv(text: &str) -> Result<Vec<FaqPair>, ImportError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::Csv(e.to_string()))?;
        if record.iter().any(|field| !field.is_empty()) {
            records.push(record);
        }
    }
    if records.len() < 2 {
        return Err(ImportError::TooFewLines);
    }

    let header = &records[0];
    let question = column(header, "question").ok_or(ImportError::MissingHeader)?;
    let answer = column(header, "answer").ok_or(ImportError::MissingHeader)?;

    let rows: Vec<FaqPair> = records[1..]
        .iter()
        .filter_map(|record| {
            let q = record.get(question).unwrap_or_default();
            let a = record.get(answer).unwrap_or_default();
            (!q.is_empty() && !a.is_empty()).then(|| FaqPair {
                question: q.to_string(),
                answer: a.to_string(),
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    Ok(rows)
}

fn column(header: &StringRecord, name: &str) -> Option<usize> {
    header.iter().position(|h| h.eq_ignore_ascii_case(name))
}

/// First rows shown before committing
pub fn preview(rows: &[FaqPair]) -> &[FaqPair] {
    &rows[..rows.len().min(PREVIEW_ROWS)]
}

/// Parsed rows waiting to be committed to one college's FAQ
pub struct FaqImport {
    ctx: WorkflowContext,
    college_id: i64,
    rows: Vec<FaqPair>,
}

impl FaqImport {
    pub fn new(ctx: WorkflowContext, college_id: i64) -> Self {
        Self {
            ctx,
            college_id,
            rows: Vec::new(),
        }
    }

    /// Check the type and parse the file; replaces any previously loaded rows.
    ///
    /// Excel types are accepted when they hold delimited text.
    pub fn load_file(&mut self, mime: &str, bytes: &[u8]) -> Result<usize, ImportError> {
        self.rows.clear();
        let parsed = if is_allowed_mime(mime) {
            parse_faq_csv(&String::from_utf8_lossy(bytes))
        } else {
            Err(ImportError::UnsupportedType(mime.to_string()))
        };

        match parsed {
            Ok(rows) => {
                self.rows = rows;
                Ok(self.rows.len())
            }
            Err(e) => {
                self.ctx.notifications.error(e.to_string());
                Err(e)
            }
        }
    }

    pub fn rows(&self) -> &[FaqPair] {
        &self.rows
    }

    pub fn preview(&self) -> &[FaqPair] {
        preview(&self.rows)
    }

    /// Send every loaded row in one bulk create
    pub async fn commit(&mut self) -> Result<usize, ClientError> {
        if self.rows.is_empty() {
            return Err(self.ctx.fail(ClientError::Validation("Load a file first".to_string())));
        }

        let _token = self
            .ctx
            .report(self.ctx.guard.try_acquire(actions::faq_import(self.college_id)))?;
        let created = self.ctx.report(
            self.ctx
                .api
                .bulk_create_faq_items(self.college_id, &self.rows)
                .await,
        )?;

        self.rows.clear();
        self.ctx.cache.invalidate(QueryKey::Faq(self.college_id)).await;
        self.ctx
            .notifications
            .success(format!("Imported {} questions", created.len()));
        Ok(created.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AuthContext, NotificationLevel};
    use crate::workflow::test_support::context;

    fn pair(q: &str, a: &str) -> FaqPair {
        FaqPair {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn test_rows_with_empty_answer_skipped() {
        let rows = parse_faq_csv("question,answer\n\"Q1\",\"A1\"\n\"Q2\",\"\"").unwrap();
        assert_eq!(rows, vec![pair("Q1", "A1")]);
    }

    #[test]
    fn test_reversed_headers() {
        let rows = parse_faq_csv("Answer,QUESTION\nA1,Q1\nA2,Q2\n").unwrap();
        assert_eq!(rows, vec![pair("Q1", "A1"), pair("Q2", "A2")]);
    }

    #[test]
    fn test_header_only_rejected() {
        assert_eq!(parse_faq_csv("question,answer\n"), Err(ImportError::TooFewLines));
        assert_eq!(parse_faq_csv("question,answer\n\n  \n"), Err(ImportError::TooFewLines));
        assert_eq!(parse_faq_csv(""), Err(ImportError::TooFewLines));
    }

    #[test]
    fn test_missing_header_and_no_valid_rows() {
        assert_eq!(parse_faq_csv("q,a\nQ1,A1"), Err(ImportError::MissingHeader));
        assert_eq!(parse_faq_csv("question,answer\n,A1\nQ2,"), Err(ImportError::NoValidRows));
    }

    #[test]
    fn test_quoted_commas_and_bom() {
        let text = "\u{feff}question,answer\n\"Fees, in total?\",\"About 1,200 per term\"\n";
        assert_eq!(
            parse_faq_csv(text).unwrap(),
            vec![pair("Fees, in total?", "About 1,200 per term")]
        );
    }

    #[test]
    fn test_extra_columns_and_short_rows() {
        let rows = parse_faq_csv("id,question,answer\n1,Q1,A1\n2,Q2\n3,  Q3 ,  A3  \n").unwrap();
        assert_eq!(rows, vec![pair("Q1", "A1"), pair("Q3", "A3")]);
    }

    #[test]
    fn test_mime_whitelist() {
        assert!(is_allowed_mime("text/csv"));
        assert!(is_allowed_mime("Text/CSV; charset=utf-8"));
        assert!(is_allowed_mime("application/vnd.ms-excel"));
        assert!(!is_allowed_mime("application/pdf"));
        assert!(!is_allowed_mime(""));
    }

    #[test]
    fn test_preview_first_five() {
        let rows: Vec<FaqPair> = (0..8).map(|i| pair(&format!("Q{}", i), "A")).collect();
        assert_eq!(preview(&rows).len(), 5);
        assert_eq!(preview(&rows[..2]).len(), 2);
    }

    #[tokio::test]
    async fn test_commit_bulk_creates_and_invalidates_faq() {
        let (api, ctx) = context(AuthContext::default());
        let _faq_view = ctx.cache.subscribe(QueryKey::Faq(3));
        let mut import = FaqImport::new(ctx.clone(), 3);

        let loaded = import
            .load_file("text/csv", b"question,answer\n\"Q1\",\"A1\"\n\"Q2\",\"\"")
            .unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(import.preview(), &[pair("Q1", "A1")]);

        assert_eq!(import.commit().await.unwrap(), 1);
        assert_eq!(api.call_count("bulk:3"), 1);
        assert_eq!(api.call_count("get_faq:3"), 1);
        assert_eq!(api.faq_items(3)[0].question, "Q1");
        assert!(import.rows().is_empty());
        assert_eq!(ctx.notifications.last().unwrap().level, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn test_unsupported_type_never_parsed_or_sent() {
        let (api, ctx) = context(AuthContext::default());
        let mut import = FaqImport::new(ctx.clone(), 3);

        let err = import.load_file("application/pdf", b"question,answer\nQ,A").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedType(_)));
        assert!(import.rows().is_empty());
        assert_eq!(ctx.notifications.last().unwrap().level, NotificationLevel::Error);

        assert!(import.commit().await.is_err());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_rows() {
        let (api, ctx) = context(AuthContext::default());
        let mut import = FaqImport::new(ctx, 3);
        import.load_file("text/csv", b"question,answer\nQ,A").unwrap();

        api.fail_next(ClientError::Network("timeout".to_string()));
        assert!(import.commit().await.is_err());
        assert_eq!(import.rows().len(), 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn cell() -> impl Strategy<Value = String> {
            "[a-zA-Z0-9?][a-zA-Z0-9 ,\"?]{0,20}"
        }

        proptest! {
            #[test]
            fn prop_column_order_independent(
                pairs in prop::collection::vec((cell(), cell()), 1..10),
                reversed in any::<bool>(),
            ) {
                let mut writer = csv::Writer::from_writer(Vec::new());
                if reversed {
                    writer.write_record(["answer", "question"]).unwrap();
                } else {
                    writer.write_record(["question", "answer"]).unwrap();
                }
                for (q, a) in &pairs {
                    if reversed {
                        writer.write_record([a, q]).unwrap();
                    } else {
                        writer.write_record([q, a]).unwrap();
                    }
                }
                let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

                let parsed = parse_faq_csv(&text).unwrap();
                let expected: Vec<FaqPair> = pairs
                    .iter()
                    .map(|(q, a)| pair(q.trim(), a.trim()))
                    .collect();
                prop_assert_eq!(parsed, expected);
            }

            #[test]
            fn prop_never_panics(text in "\\PC{0,200}") {
                let _ = parse_faq_csv(&text);
            }
        }
    }
}
