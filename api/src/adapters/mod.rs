pub mod chatra;
pub mod openai;
pub mod postgres;
