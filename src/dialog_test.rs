use super::*;

#[test]
fn message_has_only_ok() {
    let prompt = Prompt::message("Saved diagram not found");
    assert_eq!(prompt.primary, "OK");
    assert!(prompt.alternate.is_none());
    assert!(prompt.cancel.is_none());
    assert!(prompt.input.is_none());
}

#[test]
fn enter_confirms_with_current_input() {
    let prompt = Prompt::text("Set item notes", "old");
    assert_eq!(prompt.choice_for_key("Enter", Some("new"), None), Some(UserChoice::text("new")));
    assert_eq!(prompt.choice_for_key("Enter", None, None), Some(UserChoice::text("old")));
}

#[test]
fn enter_includes_colour_when_picker_shown() {
    let prompt = Prompt::text("Add a text label", "").with_colour("Select a label colour:", "#FF0000");
    let choice = prompt.choice_for_key("Enter", Some("hi"), None);
    assert_eq!(choice, Some(UserChoice::Confirm { text: Some("hi".into()), colour: Some("#FF0000".into()) }));
}

#[test]
fn escape_cancels_only_when_cancel_shown() {
    assert_eq!(Prompt::yes_no_cancel("Save changes?").choice_for_key("Escape", None, None), Some(UserChoice::Cancel));
    assert_eq!(Prompt::message("Oops").choice_for_key("Escape", None, None), None);
}

#[test]
fn other_keys_do_nothing() {
    assert_eq!(Prompt::text("x", "").choice_for_key("a", None, None), None);
}

#[test]
fn confirmed_text_is_trimmed_and_non_empty() {
    assert_eq!(UserChoice::text("  hello ").confirmed_text(), Some("hello"));
    assert_eq!(UserChoice::text("   ").confirmed_text(), None);
    assert_eq!(UserChoice::ok().confirmed_text(), None);
    assert_eq!(UserChoice::Cancel.confirmed_text(), None);
}

#[test]
fn closures_are_prompters() {
    let mut asked = Vec::new();
    let mut prompter = |p: &Prompt| {
        asked.push(p.message.clone());
        UserChoice::Alternate
    };
    assert_eq!(prompter.prompt(&Prompt::yes_no_cancel("Overwrite?")), UserChoice::Alternate);
    drop(prompter);
    assert_eq!(asked, vec!["Overwrite?".to_owned()]);
}

#[test]
fn confirmed_colour_skips_empty_picker() {
    let choice = UserChoice::Confirm { text: Some("x".into()), colour: Some(String::new()) };
    assert_eq!(choice.confirmed_colour(), None);
    let choice = UserChoice::Confirm { text: None, colour: Some("#00FF00".into()) };
    assert_eq!(choice.confirmed_colour(), Some("#00FF00"));
    assert_eq!(UserChoice::Cancel.confirmed_colour(), None);
}
