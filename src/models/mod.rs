pub mod appointment;
pub mod bill;
pub mod facility;
pub mod medical_record;
pub mod medication;
pub mod notification;
pub mod user;

pub use appointment::*;
pub use bill::*;
pub use facility::*;
pub use medical_record::*;
pub use medication::*;
pub use notification::*;
pub use user::*;
