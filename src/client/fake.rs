//! In-memory backend used by the client and workflow tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::{ClientError, CmsApi};
use crate::models::{
    delete_confirmation_phrase, DeleteStep, DeleteUniversityRequest, DeleteUniversityResponse, EditStep,
    EditUniversityRequest, EditUniversityResponse, Faq, FaqItem, FaqPair, FieldType, FormField,
    FormSubmission, ImpactStats, ProcessSubmissionInput, Program, SubmissionCount, SubmissionDetail,
    SubmissionStatus, University,
};

pub const FAKE_CODE: &str = "424242";

#[derive(Default)]
struct State {
    university: Option<University>,
    issued_code: Option<String>,
    delete_verified: bool,
    faq_items: HashMap<i64, Vec<FaqItem>>,
    submissions: HashMap<i64, Vec<SubmissionDetail>>,
    fail_next: Option<ClientError>,
    calls: Vec<String>,
}

/// Mimics the backend closely enough to drive the workflows
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        let university = University::new("X".to_string(), "x".to_string());
        Self {
            state: Mutex::new(State {
                university: Some(university),
                ..State::default()
            }),
        }
    }

    /// Make the next call fail with `err`
    pub fn fail_next(&self, err: ClientError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    pub fn add_submission(&self, college_id: i64, id: i64, data: &[(&str, &str)]) {
        let detail = SubmissionDetail {
            submission: FormSubmission {
                id,
                form_section_id: 1,
                data: data.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                status: SubmissionStatus::Pending,
                submitted_at: Utc::now(),
                resolved_at: None,
            },
            form_title: "Ask us".to_string(),
            fields: data
                .iter()
                .map(|(k, _)| FormField {
                    id: k.to_string(),
                    label: format!("Question {}", k),
                    field_type: FieldType::Textarea,
                    required: true,
                })
                .collect(),
        };
        self.state.lock().unwrap().submissions.entry(college_id).or_default().push(detail);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls equal to `name`
    pub fn call_count(&self, name: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| c.as_str() == name).count()
    }

    pub fn university_exists(&self) -> bool {
        self.state.lock().unwrap().university.is_some()
    }

    pub fn faq_items(&self, college_id: i64) -> Vec<FaqItem> {
        self.state.lock().unwrap().faq_items.get(&college_id).cloned().unwrap_or_default()
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, State>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

fn server_error(status: u16, message: &str) -> ClientError {
    ClientError::Server {
        status,
        message: message.to_string(),
    }
}

fn check_code(state: &mut State, code: Option<&str>) -> Result<(), ClientError> {
    match (&state.issued_code, code) {
        (None, _) => Err(server_error(400, "Verification code expired or not requested")),
        (Some(issued), Some(code)) if issued == code.trim() => {
            state.issued_code = None;
            Ok(())
        }
        _ => Err(server_error(400, "Invalid verification code")),
    }
}

#[async_trait]
impl CmsApi for FakeApi {
    async fn get_university(&self) -> Result<University, ClientError> {
        let state = self.begin("get_university".to_string())?;
        state
            .university
            .clone()
            .ok_or_else(|| server_error(404, "University not found"))
    }

    async fn edit_university(&self, request: &EditUniversityRequest) -> Result<EditUniversityResponse, ClientError> {
        let step = match request.verification_step {
            EditStep::Request => "request",
            EditStep::Verify => "verify",
        };
        let mut state = self.begin(format!("edit:{}", step))?;
        match request.verification_step {
            EditStep::Request => {
                state.issued_code = Some(FAKE_CODE.to_string());
                Ok(EditUniversityResponse {
                    verification_code: Some(FAKE_CODE.to_string()),
                    message: "Verification code sent".to_string(),
                    ..Default::default()
                })
            }
            EditStep::Verify => {
                check_code(&mut state, request.verification_code.as_deref())?;
                let university = state
                    .university
                    .as_mut()
                    .ok_or_else(|| server_error(404, "University not found"))?;
                university.name = request.name.clone();
                Ok(EditUniversityResponse {
                    university: Some(university.clone()),
                    message: "University updated".to_string(),
                    ..Default::default()
                })
            }
        }
    }

    async fn delete_university(
        &self,
        request: &DeleteUniversityRequest,
    ) -> Result<DeleteUniversityResponse, ClientError> {
        let step = match request.verification_step {
            DeleteStep::Initiate => "initiate",
            DeleteStep::Verify => "verify",
            DeleteStep::Confirm => "confirm",
        };
        let mut state = self.begin(format!("delete:{}", step))?;
        let name = state
            .university
            .as_ref()
            .map(|u| u.name.clone())
            .ok_or_else(|| server_error(404, "University not found"))?;

        match request.verification_step {
            DeleteStep::Initiate => {
                state.issued_code = Some(FAKE_CODE.to_string());
                state.delete_verified = false;
                Ok(DeleteUniversityResponse {
                    verification_code: Some(FAKE_CODE.to_string()),
                    university: Some(ImpactStats {
                        name,
                        colleges_count: 3,
                        total_users: 120,
                        total_forms: 8,
                    }),
                    message: "Verification code sent".to_string(),
                })
            }
            DeleteStep::Verify => {
                check_code(&mut state, request.verification_code.as_deref())?;
                state.delete_verified = true;
                Ok(DeleteUniversityResponse {
                    message: "Verification successful".to_string(),
                    ..Default::default()
                })
            }
            DeleteStep::Confirm => {
                if request.final_confirmation.as_deref() != Some(delete_confirmation_phrase(&name).as_str()) {
                    return Err(server_error(400, "Confirmation text does not match"));
                }
                if !state.delete_verified {
                    return Err(server_error(400, "Verification step not completed"));
                }
                state.university = None;
                Ok(DeleteUniversityResponse {
                    message: "University deleted".to_string(),
                    ..Default::default()
                })
            }
        }
    }

    async fn get_faq(&self, college_id: i64) -> Result<Faq, ClientError> {
        let state = self.begin(format!("get_faq:{}", college_id))?;
        Ok(Faq {
            id: college_id,
            college_id,
            title: "Frequently Asked Questions".to_string(),
            description: None,
            form_id: None,
            items: state.faq_items.get(&college_id).cloned().unwrap_or_default(),
        })
    }

    async fn bulk_create_faq_items(&self, college_id: i64, items: &[FaqPair]) -> Result<Vec<FaqItem>, ClientError> {
        let mut state = self.begin(format!("bulk:{}", college_id))?;
        let existing = state.faq_items.entry(college_id).or_default();
        let created: Vec<FaqItem> = items
            .iter()
            .map(|pair| {
                let order = existing.len() as i32;
                let mut item = FaqItem::new(college_id, pair.question.clone(), pair.answer.clone(), order);
                item.id = order as i64 + 1;
                existing.push(item.clone());
                item
            })
            .collect();
        Ok(created)
    }

    async fn list_submissions(&self, college_id: i64) -> Result<Vec<SubmissionDetail>, ClientError> {
        let state = self.begin(format!("list_submissions:{}", college_id))?;
        Ok(state.submissions.get(&college_id).cloned().unwrap_or_default())
    }

    async fn count_submissions(&self, college_id: i64) -> Result<SubmissionCount, ClientError> {
        let state = self.begin(format!("count_submissions:{}", college_id))?;
        let count = state.submissions.get(&college_id).map(Vec::len).unwrap_or(0);
        Ok(SubmissionCount { count: count as i64 })
    }

    async fn process_submission(
        &self,
        college_id: i64,
        submission_id: i64,
        input: &ProcessSubmissionInput,
    ) -> Result<(), ClientError> {
        let mut state = self.begin(format!("process:{}:{}", college_id, submission_id))?;
        let pending = state.submissions.entry(college_id).or_default();
        let index = pending
            .iter()
            .position(|s| s.submission.id == submission_id)
            .ok_or_else(|| server_error(409, "Submission already resolved"))?;
        let detail = pending.remove(index);

        if input.action == crate::models::SubmissionAction::Approve {
            let answers: &BTreeMap<String, String> = &input.answers;
            let items = state.faq_items.entry(college_id).or_default();
            for (field_id, question) in &detail.submission.data {
                if let Some(answer) = answers.get(field_id) {
                    let order = items.len() as i32;
                    items.push(FaqItem::new(college_id, question.clone(), answer.clone(), order));
                }
            }
        }
        Ok(())
    }

    async fn list_programs(&self, college_id: i64) -> Result<Vec<Program>, ClientError> {
        self.begin(format!("list_programs:{}", college_id))?;
        Ok(Vec::new())
    }
}
