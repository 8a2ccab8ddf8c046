pub mod assignment;
pub mod department;
pub mod doctor;
pub mod enums;
pub mod filters;
pub mod illness;
pub mod medical_record;
pub mod patient;

pub use assignment::*;
pub use department::*;
pub use doctor::*;
pub use filters::*;
pub use illness::*;
pub use medical_record::*;
pub use patient::*;
