pub mod category;
pub mod dictionary;
pub mod examples;
pub mod media;
pub mod quiz;
pub mod speech;
