pub mod bookingmodel;
pub mod locationmodel;
pub mod propertymodel;
