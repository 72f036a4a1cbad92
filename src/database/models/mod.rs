pub mod examination;
pub mod facility;
pub mod facility_link;
pub mod individual;
pub mod practitioner;

pub use examination::{
    Attachment, Examination, ImageAsset, ImageSeries, NewAttachment, NewExamination, NewImageAsset, NewImageSeries,
};
pub use facility::{Facility, NewFacility};
pub use facility_link::{FacilityLink, NewFacilityLink};
pub use individual::{Individual, NewIndividual};
pub use practitioner::{NewPractitioner, Practitioner};
