//! Resumes and job descriptions owned by a user. Thin storage for the
//! material cover letters are generated from.

pub mod jobs;
pub mod resumes;
pub mod store;
