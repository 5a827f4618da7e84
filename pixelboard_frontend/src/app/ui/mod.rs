pub mod editor;
pub mod gallery;
