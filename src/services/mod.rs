//! Services layer - Business logic
//!
//! Services implement the CMS rules on top of the repositories:
//! - Validation and tenant scoping
//! - Staged verification of sensitive university mutations
//! - Cache invalidation after every write
//! - Markdown rendering for the public endpoints

pub mod email;
pub mod faq;
pub mod form;
pub mod markdown;
pub mod program;
pub mod university;
pub mod verification;

pub use email::{generate_verification_code, EmailService};
pub use faq::{FaqService, FaqServiceError, PublicFaq, PublicFaqItem};
pub use form::{FormService, FormServiceError};
pub use markdown::{compact_view, extract_toc, truncate, CompactView, MarkdownRenderer, RenderedMarkdown, TocEntry};
pub use program::{ProgramService, ProgramServiceError, PublicProgram, PublicProgramSection};
pub use university::{generate_slug, PublicCollege, PublicCollegeSection, UniversityService, UniversityServiceError};
pub use verification::{VerificationError, VerificationService, VerifiedAction};
