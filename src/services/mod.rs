pub mod examination_service;
pub mod facility_service;
pub mod identity;
pub mod individual_service;
pub mod passcode;
pub mod practitioner_service;

pub use examination_service::{ExaminationService, ExaminationStores, ExaminationView};
pub use facility_service::FacilityService;
pub use identity::{IdentityResolver, Onboardable, ResolvedIdentity};
pub use individual_service::IndividualService;
pub use practitioner_service::PractitionerService;
