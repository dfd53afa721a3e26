//! In-page element lookup by accessible role/name or exact text.
//!
//! CDP has no role-based query, so a small script walks the DOM, picks the
//! matching element once it is visible and tags it with [`MARK_ATTR`]. The
//! driver then resolves it through an ordinary CSS attribute selector and
//! interacts with it using real input events.

use serde_json::json;

use super::Target;

/// Attribute the lookup script stamps on the element it found.
pub const MARK_ATTR: &str = "data-wifi-curfew-target";

const LOOKUP_JS: &str = r#"
(() => {
  const query = __QUERY__;
  document.querySelectorAll('[' + query.attr + ']').forEach((el) => el.removeAttribute(query.attr));

  const normalize = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const visible = (el) => {
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';
  };
  const roleSelectors = {
    link: 'a[href], area[href], [role="link"]',
    textbox: 'input:not([type]), input[type="text"], input[type="password"], input[type="email"], '
      + 'input[type="search"], input[type="tel"], input[type="url"], textarea, [role="textbox"], '
      + '[contenteditable="true"]',
    button: 'button, input[type="button"], input[type="submit"], input[type="reset"], '
      + 'input[type="image"], [role="button"]',
  };
  const accessibleName = (el) => {
    const aria = el.getAttribute('aria-label');
    if (aria) return aria;
    const labelledBy = el.getAttribute('aria-labelledby');
    if (labelledBy) {
      return labelledBy.split(/\s+/).map((id) => {
        const node = document.getElementById(id);
        return node ? node.textContent : '';
      }).join(' ');
    }
    if (el.labels && el.labels.length) {
      return Array.from(el.labels).map((l) => l.textContent).join(' ');
    }
    if (el.tagName === 'INPUT') {
      const type = (el.getAttribute('type') || '').toLowerCase();
      if (['button', 'submit', 'reset'].includes(type)) return el.value || '';
      return el.getAttribute('placeholder') || el.getAttribute('title') || '';
    }
    return el.innerText || el.textContent || el.getAttribute('title') || '';
  };

  let matches;
  if (query.kind === 'role') {
    const wanted = normalize(query.name).toLowerCase();
    matches = Array.from(document.querySelectorAll(roleSelectors[query.role]))
      .filter((el) => normalize(accessibleName(el)).toLowerCase().includes(wanted));
  } else {
    const ownsText = (el) => normalize(el.textContent) === query.text
      && !Array.from(el.children).some((c) => normalize(c.textContent) === query.text);
    matches = Array.from(document.querySelectorAll('body *')).filter(ownsText);
  }

  // Role lookups skip hidden elements like the accessibility tree does.
  // Text lookups index every match, so the nth toggle stays the nth toggle
  // and the caller keeps polling until that one is shown.
  const pool = query.kind === 'role' ? matches.filter(visible) : matches;
  const el = pool[query.nth];
  if (!el || !visible(el)) return false;
  el.setAttribute(query.attr, query.token);
  return true;
})()
"#;

/// Script that marks the element `target` refers to with `token` and
/// evaluates to `true`, or evaluates to `false` when nothing matches yet.
pub fn lookup_script(target: &Target, token: &str) -> String {
    let query = match target {
        Target::Role { role, name } => json!({
            "kind": "role",
            "role": role.as_str(),
            "name": name,
            "nth": 0,
            "attr": MARK_ATTR,
            "token": token,
        }),
        Target::Text { text, nth } => json!({
            "kind": "text",
            "text": text,
            "nth": nth,
            "attr": MARK_ATTR,
            "token": token,
        }),
    };
    LOOKUP_JS.replace("__QUERY__", &query.to_string())
}

/// CSS selector for the element a successful lookup marked.
pub fn marked_selector(token: &str) -> String {
    format!("[{}=\"{}\"]", MARK_ATTR, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Role;

    #[test]
    fn test_role_lookup_embeds_query() {
        let js = lookup_script(&Target::role(Role::Textbox, "Password:"), "t1");
        assert!(js.contains(r#""kind":"role""#));
        assert!(js.contains(r#""role":"textbox""#));
        assert!(js.contains(r#""name":"Password:""#));
        assert!(js.contains(r#""token":"t1""#));
        assert!(!js.contains("__QUERY__"));
    }

    #[test]
    fn test_text_lookup_keeps_index() {
        let js = lookup_script(&Target::text("ON", 2), "t2");
        assert!(js.contains(r#""kind":"text""#));
        assert!(js.contains(r#""nth":2"#));
    }

    #[test]
    fn test_text_lookup_indexes_before_visibility() {
        let js = lookup_script(&Target::text("ON", 1), "t4");
        assert!(js.contains("query.kind === 'role' ? matches.filter(visible) : matches"));
        assert!(js.contains("const el = pool[query.nth];"));
        assert!(js.contains("if (!el || !visible(el)) return false;"));
    }

    #[test]
    fn test_names_are_json_escaped() {
        let target = Target::Role {
            role: Role::Button,
            name: "Say \"hi\"",
        };
        let js = lookup_script(&target, "t3");
        assert!(js.contains(r#""name":"Say \"hi\"""#));
    }

    #[test]
    fn test_marked_selector() {
        assert_eq!(marked_selector("abc"), "[data-wifi-curfew-target=\"abc\"]");
    }
}
