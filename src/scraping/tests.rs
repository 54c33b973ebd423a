//! Fixture tests for the HTML extraction helpers.

use super::{extract_csrf_token, extract_error_list, extract_login};
use rstest::rstest;

const STATUS_PAGE_WITH_ACCOUNT: &str = r#"
<div class="box">
  <div class="label_req">Login</div>
  <div class="element">sv42-admin</div>
  <div class="label_req">Status</div>
  <div class="element">active</div>
</div>
"#;

const STATUS_PAGE_WITHOUT_ACCOUNT: &str = r#"
<div class="box">
  <p>No administrative login has been configured for this server.</p>
</div>
"#;

#[test]
fn extract_login_finds_the_rendered_name() {
    assert_eq!(
        extract_login(STATUS_PAGE_WITH_ACCOUNT),
        Some(String::from("sv42-admin"))
    );
}

#[test]
fn extract_login_returns_none_without_an_account() {
    assert_eq!(extract_login(STATUS_PAGE_WITHOUT_ACCOUNT), None);
}

#[test]
fn extract_login_spans_markup_between_label_and_value() {
    let html = "<td class=\"label_req\">Login</td>\n<td>\n<span class=\"element\">root-admin</span>";
    assert_eq!(extract_login(html), Some(String::from("root-admin")));
}

#[rstest]
#[case(r#"<input type="hidden" name="password[_csrf_token]" value="f00ba4" />"#)]
#[case(r#"<input value="f00ba4" type="hidden" name="password[_csrf_token]">"#)]
fn extract_csrf_token_tolerates_attribute_order(#[case] html: &str) {
    assert_eq!(
        extract_csrf_token(html, "password[_csrf_token]"),
        Some(String::from("f00ba4"))
    );
}

#[test]
fn extract_csrf_token_ignores_other_inputs() {
    let html = r#"
      <input type="text" name="password[new_password]" value="">
      <input type="hidden" name="password[_csrf_token]" value="t0k3n">
    "#;
    assert_eq!(
        extract_csrf_token(html, "password[_csrf_token]"),
        Some(String::from("t0k3n"))
    );
}

#[test]
fn extract_csrf_token_missing_field_yields_none() {
    let html = r#"<input type="text" name="unrelated" value="x">"#;
    assert_eq!(extract_csrf_token(html, "password[_csrf_token]"), None);
}

#[test]
fn extract_error_list_collects_all_items() {
    let html = r#"
      <ul class="error_list">
        <li> Password is too short </li>
        <li>Password must contain a digit</li>
      </ul>
    "#;
    assert_eq!(
        extract_error_list(html),
        vec![
            String::from("Password is too short"),
            String::from("Password must contain a digit"),
        ]
    );
}

#[test]
fn extract_error_list_is_empty_without_a_block() {
    assert!(extract_error_list("<div class=\"msgbox_success\">done</div>").is_empty());
}
