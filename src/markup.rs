//! Candidate extraction from raw Wiktionary page source.
//!
//! Pulls definitions out of the "Значение" section and English
//! translations out of the "Перевод" section, stripping wiki markup
//! (templates, links, comments, emphasis) along the way.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Extraction;

/// Heading of the definitions section
pub const MEANING_HEADING: &str = "Значение";

/// Heading of the translations section
pub const TRANSLATION_HEADING: &str = "Перевод";

/// Usage examples start with this template; definitions end before it.
const EXAMPLE_TEMPLATE: &str = "{{пример";

static INNERMOST_TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("valid template pattern"));

// [[target]] or [[target|display]]; the last segment is what readers see
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(?:[^\[\]|]*\|)*([^\[\]|]*)\]\]").expect("valid link pattern"));

static ENGLISH_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\s*en\s*=").expect("valid parameter pattern"));

static ENGLISH_BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*\*+\s*(?:\{\{(?:lang-)?en\}\}\s*:?|(?:английский|англ\.|en)\s*:)(.*)$")
        .expect("valid bullet pattern")
});

/// Meanings (document order) and deduplicated translations of a page
pub fn extract(markup: &str) -> Extraction {
    Extraction {
        meanings: meanings(markup),
        translations: translations(markup),
    }
}

/// Definition lines of the first "Значение" section
pub fn meanings(markup: &str) -> Vec<String> {
    let Some(lines) = section(markup, MEANING_HEADING) else {
        return Vec::new();
    };

    lines
        .into_iter()
        .filter_map(definition_body)
        .map(|raw| match raw.find(EXAMPLE_TEMPLATE) {
            Some(pos) => &raw[..pos],
            None => raw,
        })
        .map(clean)
        .filter(|c| !c.is_empty())
        .collect()
}

/// English translations of the first "Перевод" section
pub fn translations(markup: &str) -> Vec<String> {
    let Some(lines) = section(markup, TRANSLATION_HEADING) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    let mut push = |raw: &str| {
        let cleaned = clean(raw);
        if !cleaned.is_empty() && seen.insert(cleaned.clone()) {
            result.push(cleaned);
        }
    };

    for line in lines {
        if let Some(captures) = ENGLISH_BULLET.captures(line) {
            let rest = captures.get(1).map_or("", |m| m.as_str());
            for link in LINK.captures_iter(rest) {
                push(link.get(1).map_or("", |m| m.as_str()));
            }
            continue;
        }
        for found in ENGLISH_PARAM.find_iter(line) {
            push(param_value(&line[found.end()..]));
        }
    }

    result
}

/// Lines under the first heading titled `title`, up to the next heading of
/// the same or a higher level.
fn section<'a>(markup: &'a str, title: &str) -> Option<Vec<&'a str>> {
    let mut lines = markup.lines();
    let level = lines.by_ref().find_map(|line| match heading(line) {
        Some((level, name)) if name == title => Some(level),
        _ => None,
    })?;

    Some(
        lines
            .take_while(|line| !matches!(heading(line), Some((next, _)) if next <= level))
            .collect(),
    )
}

/// `== Title ==` -> `(2, "Title")`
fn heading(line: &str) -> Option<(usize, &str)> {
    let line = line.trim();
    let leading = line.chars().take_while(|&c| c == '=').count();
    let trailing = line.chars().rev().take_while(|&c| c == '=').count();
    if leading == 0 || trailing == 0 || leading + trailing >= line.len() {
        return None;
    }
    let level = leading.min(trailing);
    let name = line[level..line.len() - level].trim_matches('=').trim();
    (!name.is_empty()).then_some((level, name))
}

/// Text of a top-level `#` definition line; `##`, `#:` and `#*` are sub-items.
fn definition_body(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('#')?;
    match rest.chars().next() {
        Some('#' | ':' | '*') => None,
        _ => Some(rest),
    }
}

/// Value of a template parameter: everything up to the next `|` or the
/// closing `}}` that is not nested inside a link or template.
fn param_value(rest: &str) -> &str {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let pair = bytes.get(i + 1) == Some(&bytes[i]);
        match bytes[i] {
            b'[' | b'{' if pair => {
                depth += 1;
                i += 2;
                continue;
            }
            b']' | b'}' if pair => {
                if depth == 0 {
                    return &rest[..i];
                }
                depth -= 1;
                i += 2;
                continue;
            }
            b'|' if depth == 0 => return &rest[..i],
            _ => {}
        }
        i += 1;
    }
    rest
}

/// Strip wiki markup down to plain text. Cleaning clean text is a no-op.
pub fn clean(text: &str) -> String {
    let mut current = clean_pass(text);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let text = strip_comments(text);
    let text = strip_templates(&text);
    let text = LINK.replace_all(&text, "$1");
    let text = text.replace("'''", "").replace("''", "");
    let text = match text.find('|') {
        Some(pos) => &text[..pos],
        None => text.as_str(),
    };
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    trim_trailing_period(&text).to_string()
}

fn strip_comments(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<!--") {
        result.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => return result,
        }
    }
    result.push_str(rest);
    result
}

/// Removes innermost `{{...}}` until nothing changes. An unclosed `{{`
/// swallows the rest of the text and stray `}}` are dropped.
fn strip_templates(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = INNERMOST_TEMPLATE.replace_all(&current, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }

    if let Some(open) = current.find("{{") {
        current.truncate(open);
    }
    current.replace("}}", "")
}

/// Drops one closing period, leaving ellipses alone.
fn trim_trailing_period(text: &str) -> &str {
    let mut current = text;
    while let Some(stripped) = current.strip_suffix('.') {
        if stripped.ends_with('.') {
            break;
        }
        current = stripped.trim_end();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"= {{-ru-}} =
=== Морфологические и синтаксические свойства ===
{{сущ ru f ina 1a
|основа=книг
}}
=== Семантические свойства ===
==== Значение ====
# [[печатный|печатное]] [[издание]] в виде [[сшитый|сшитых]] [[лист|листов]] {{пример|Он читал '''книгу'''.|Толстой}}
#: Пример строки
## подзначение
#* цитата
# {{помета|устар.}} ''отдел'' крупного произведения. <!-- уточнить -->
# [[издание|Издание]]
==== Синонимы ====
# [[том]]
=== Перевод ===
{{перев-блок|
|en=[[book]]
|de=[[Buch]]
}}
* английский: [[book]], [[volume|volume]]
* немецкий: [[Buch]]
=== Библиография ===
* [[книга]]
"#;

    #[test]
    fn test_extract_meanings() {
        assert_eq!(
            meanings(PAGE),
            vec![
                "печатное издание в виде сшитых листов".to_string(),
                "отдел крупного произведения".to_string(),
                "Издание".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_translations_dedup() {
        assert_eq!(translations(PAGE), vec!["book".to_string(), "volume".to_string()]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        assert_eq!(extract(PAGE), extract(PAGE));
    }

    #[test]
    fn test_meanings_keep_duplicates() {
        let page = "==== Значение ====\n# [[читать]]\n# ''читать''\n";
        assert_eq!(meanings(page), vec!["читать".to_string(), "читать".to_string()]);
    }

    #[test]
    fn test_dedup_after_cleaning() {
        let page = "=== Перевод ===\n|en=''read''\n* {{en}}: [[read]], [[peruse]]\n|en=[[read|read]]<!-- x -->\n";
        assert_eq!(translations(page), vec!["read".to_string(), "peruse".to_string()]);
    }

    #[test]
    fn test_inline_template_parameters() {
        let page = "=== Перевод ===\n{{перев-блок||de=[[lesen]]|en=[[read]], [[peruse]]|fr=[[lire]]}}\n";
        assert_eq!(translations(page), vec!["read, peruse".to_string()]);
    }

    #[test]
    fn test_missing_sections() {
        let page = "= {{-ru-}} =\n=== Этимология ===\nот слова";
        assert_eq!(extract(page), Extraction::default());
    }

    #[test]
    fn test_section_ends_at_same_level_heading() {
        let page = "==== Значение ====\n# первое\n===== Примечания =====\n# второе\n==== Антонимы ====\n# третье\n";
        assert_eq!(meanings(page), vec!["первое".to_string(), "второе".to_string()]);
    }

    #[test]
    fn test_only_first_meaning_section_is_used() {
        let page = "==== Значение ====\n# первое\n=== Перевод ===\n==== Значение ====\n# другое\n";
        assert_eq!(meanings(page), vec!["первое".to_string()]);
    }

    #[test]
    fn test_heading_parsing() {
        assert_eq!(heading("==== Значение ===="), Some((4, "Значение")));
        assert_eq!(heading("==Перевод=="), Some((2, "Перевод")));
        assert_eq!(heading("= {{-ru-}} ="), Some((1, "{{-ru-}}")));
        assert_eq!(heading("===="), None);
        assert_eq!(heading("# не заголовок"), None);
    }

    #[test]
    fn test_clean_markup() {
        assert_eq!(clean("[[читать|Читать]] '''вслух'''"), "Читать вслух");
        assert_eq!(clean("{{помета|разг.}}  текст\n с   пробелами."), "текст с пробелами");
        assert_eq!(clean("значение | лишнее"), "значение");
        assert_eq!(clean("до <!-- комментарий --> после"), "до после");
        assert_eq!(clean("и так далее..."), "и так далее...");
        assert_eq!(clean("{{a|{{b|c}}}}"), "");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            "[[печатный|печатное]] [[издание]] {{пример|x}}",
            "''курсив'' и '''жирный'''.",
            "x. .",
            "{''{шаблон}}",
            "a\t\tb..",
            "{{незакрытый|шаблон [[ссылка]]",
            "<!-- незакрытый комментарий",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "re-cleaning changed {:?}", sample);
        }
    }

    #[test]
    fn test_unbalanced_templates_terminate() {
        assert_eq!(clean("читать {{помета|книжн. [[вслух]]"), "читать");
        assert_eq!(clean("читать }} вслух"), "читать вслух");
        assert_eq!(clean("{{{{{{"), "");

        let page = "==== Значение ====\n# [[читать]] {{помета|{{незакрыто\n# [[писать]]}}\n";
        assert_eq!(meanings(page), vec!["читать".to_string(), "писать".to_string()]);
    }

    #[test]
    fn test_param_value() {
        assert_eq!(param_value("[[book]]|de=[[Buch]]"), "[[book]]");
        assert_eq!(param_value("[[a|b]], [[c]]}}"), "[[a|b]], [[c]]");
        assert_eq!(param_value("{{l|en|read}} x"), "{{l|en|read}} x");
    }
}
