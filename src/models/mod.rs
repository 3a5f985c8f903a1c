//! Data models
//!
//! Entities owned by the backend and the request/response types exchanged
//! with the dashboard client. JSON field names are camelCase on the wire.

mod college;
mod faq;
mod form;
mod program;
mod university;

pub use college::{
    College, CollegeLeader, CollegeSection, CollegeType, CreateCollegeInput, GalleryImage,
    SectionType,
};
pub use faq::{
    BulkCreateFaqItemsInput, CreateFaqItemInput, Faq, FaqItem, FaqPair, UpdateFaqInput,
    UpdateFaqItemInput,
};
pub use form::{
    FieldType, FormField, FormPurpose, FormSection, FormSubmission, GenerateFormInput,
    ProcessSubmissionInput, SubmissionAction, SubmissionCount, SubmissionDetail,
    SubmissionStatus, SubmitFormInput,
};
pub use program::{
    CreateProgramInput, Program, ProgramDescription, ProgramLink, UpdateProgramInput,
};
pub use university::{
    delete_confirmation_phrase, CollegeSummary, CreateUniversityInput, DeleteStep, DeleteUniversityRequest,
    DeleteUniversityResponse, EditStep, EditUniversityRequest, EditUniversityResponse,
    ImpactStats, MemberRole, NewsItem, University, UniversityContent,
};
