//! Integration test: the three-step registration-shaped wizard.
//!
//! Step 1 requires `email`, `password`, and a matching `confirmPassword`;
//! step 2 requires `facilityName`; step 3 is a confirmation step.

use parkwiz_core::{ErrorKind, FieldId};
use parkwiz_state::{NavigationOutcome, StepDefinition, WizardController};
use parkwiz_validation::{FieldRule, Rule};

fn wizard() -> WizardController {
    WizardController::new(vec![
        StepDefinition::new("account")
            .field(FieldRule::required("email").check(Rule::Email))
            .field(
                FieldRule::required("password")
                    .check(Rule::MinLength { min: 8 })
                    .sensitive(),
            )
            .field(
                FieldRule::required("confirmPassword")
                    .check(Rule::Matches {
                        field: FieldId::from("password"),
                    })
                    .sensitive(),
            ),
        StepDefinition::new("facility").field(FieldRule::required("facilityName")),
        StepDefinition::new("review"),
    ])
    .expect("valid wizard")
}

#[test]
fn account_step_then_blocked_facility_step() {
    let mut w = wizard();
    w.set_field("email", "x@y.com");
    w.set_field("password", "Abc12345");
    w.set_field("confirmPassword", "Abc12345");

    assert_eq!(w.advance(), NavigationOutcome::Advanced);
    assert_eq!(w.current_index(), 1);

    assert_eq!(
        w.advance(),
        NavigationOutcome::Invalid(ErrorKind::StepIncomplete)
    );
    assert_eq!(w.current_index(), 1);
    assert_eq!(w.error_for("facilityName"), Some(&ErrorKind::Required));
}

#[test]
fn full_walk_to_last_step_and_back() {
    let mut w = wizard();
    w.set_field("email", "x@y.com");
    w.set_field("password", "Abc12345");
    w.set_field("confirmPassword", "Abc12345");
    w.advance();
    w.set_field("facilityName", "Harbour Street Garage");
    assert_eq!(w.advance(), NavigationOutcome::Advanced);
    assert!(w.is_last_step());

    // The last step never submits by itself.
    assert_eq!(w.advance(), NavigationOutcome::NoOp);

    for expected in [1, 0] {
        assert_eq!(w.back(), NavigationOutcome::WentBack);
        assert_eq!(w.current_index(), expected);
    }
    assert_eq!(w.back(), NavigationOutcome::NoOp);
}

#[test]
fn mismatched_confirmation_blocks_advance() {
    let mut w = wizard();
    w.set_field("email", "x@y.com");
    w.set_field("password", "Abc12345");
    w.set_field("confirmPassword", "Abc12346");

    assert_eq!(
        w.advance(),
        NavigationOutcome::Invalid(ErrorKind::StepIncomplete)
    );
    assert_eq!(w.error_for("confirmPassword"), Some(&ErrorKind::Mismatch));
    assert_eq!(w.error_for("email"), None);
    assert_eq!(w.error_for("password"), None);
}

#[test]
fn snapshot_serializes_for_the_host() {
    let mut w = wizard();
    w.set_field("email", "x@y.com");
    w.set_field("password", "Abc12345");
    w.advance();

    let json = serde_json::to_value(w.snapshot()).unwrap();
    assert_eq!(json["step_id"], "account");
    assert_eq!(json["values"]["password"], "[REDACTED]");
    assert_eq!(json["errors"]["confirmPassword"]["kind"], "required");
    assert_eq!(json["can_advance"], false);
}
