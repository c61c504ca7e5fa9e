mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio::runtime::Handle;

use rust_chatbot::common::Route;
use rust_chatbot::session::{EntryForm, EntryMode, IdentityGateway};

use common::FakeIdentity;

fn filled(mode: EntryMode, email: &str, password: &str) -> EntryForm {
    let mut form = EntryForm::new(mode);
    form.email = email.to_string();
    form.password = password.to_string();
    form
}

#[tokio::test]
async fn login_navigates_to_chat() {
    let identity = FakeIdentity::new();
    identity.register("ada@example.com", "hunter22", "u1");
    let gateway: Arc<dyn IdentityGateway> = identity.clone();

    let mut form = filled(EntryMode::Login, " ada@example.com ", "hunter22");
    form.submit(gateway, &Handle::current());
    assert!(form.is_submitting());

    assert_eq!(form.settle().await, Some(Route::Chat));
    assert_eq!(form.error(), None);
    assert!(form.password.is_empty());
    assert_eq!(
        identity.hub().current().map(|session| session.uid),
        Some("u1".to_string())
    );
}

#[tokio::test]
async fn rejected_login_shows_the_provider_message() {
    let identity = FakeIdentity::new();
    identity.register("ada@example.com", "hunter22", "u1");

    let mut form = filled(EntryMode::Login, "ada@example.com", "wrong");
    form.submit(identity.clone(), &Handle::current());

    assert_eq!(form.settle().await, None);
    assert_eq!(form.error(), Some("Invalid email or password."));
    assert!(!form.is_submitting());
    assert!(identity.hub().current().is_none());
}

#[tokio::test]
async fn signup_creates_and_signs_in() {
    let identity = FakeIdentity::new();

    let mut form = filled(EntryMode::Signup, "grace@example.com", "cobol1959");
    form.submit(identity.clone(), &Handle::current());

    assert_eq!(form.settle().await, Some(Route::Chat));
    let session = identity.hub().current();
    assert_eq!(
        session.map(|session| session.email),
        Some("grace@example.com".to_string())
    );
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    let identity = FakeIdentity::new();
    identity.register("grace@example.com", "cobol1959", "u1");

    let mut form = filled(EntryMode::Signup, "grace@example.com", "another1");
    form.submit(identity.clone(), &Handle::current());

    assert_eq!(form.settle().await, None);
    assert_eq!(
        form.error(),
        Some("An account with this email already exists.")
    );
}

#[tokio::test]
async fn invalid_fields_never_reach_the_provider() {
    let identity = FakeIdentity::new();

    let mut form = filled(EntryMode::Login, "not-an-email", "secret");
    form.submit(identity.clone(), &Handle::current());

    assert!(!form.is_submitting());
    assert_eq!(form.error(), Some("Please enter a valid email address."));
    assert_eq!(form.settle().await, None);
    assert!(!identity.hub().is_resolved());
}

#[tokio::test]
async fn poll_picks_up_a_finished_submission() {
    let identity = FakeIdentity::new();
    identity.register("ada@example.com", "hunter22", "u1");

    let mut form = filled(EntryMode::Login, "ada@example.com", "hunter22");
    form.submit(identity.clone(), &Handle::current());

    let mut next = form.poll();
    while next.is_none() && form.is_submitting() {
        tokio::task::yield_now().await;
        next = form.poll();
    }
    assert_eq!(next, Some(Route::Chat));
}
