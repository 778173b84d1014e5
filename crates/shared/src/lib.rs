pub mod action;
pub mod domain;
pub mod entity;
pub mod error;
pub mod protocol;
