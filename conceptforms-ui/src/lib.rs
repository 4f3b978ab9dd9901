//! View management for concept forms.
//!
//! A concept is shown through one or more views that share a single form.
//! The [ui::ViewManager] keeps that form in sync across views, collects
//! invalid-input notices and turns the form into a query document on commit.

pub mod ui;
