//! Prompt construction for the model-driven stages.
//!
//! Each builder returns a `(system, user)` pair. The morphology rules are
//! shared between lemma extraction and full analysis so both paths tag base
//! forms the same way.

/// Rules for turning an inflected Russian word into its tagged base form.
pub const MORPHOLOGY_RULES: &str = "\
Rules for the base form:
1. Nouns: nominative singular. Append a gender tag (m) or (f) ONLY if the base form ends with the soft sign \"ь\"; otherwise no tag.
2. Adjectives and pronouns: masculine nominative singular, no tag.
3. Adverbs: return the adverb unchanged. Never convert an adverb into an adjective.
4. Verbs: the infinitive followed by exactly one aspect tag matching how the verb is used in the sentence: (p) for perfective, (i) for imperfective.
5. Prepositions with fixed case government: append the governed case tag, one of (+nom), (+gen), (+dat), (+acc), (+instr), (+prep). Case tags are for prepositions only.
6. A base form carries at most one tag. Never add any other tags, comments or explanations.";

const FULL_ANALYSIS_EXAMPLES: &str = r#"Examples:
Sentence: "Я прочитал интересную книгу." Word: "прочитал"
{"base_form": "прочитать (p)", "translation": "to read", "meaning": "Полностью ознакомиться с содержанием написанного."}

Sentence: "На улице стоит тишь." Word: "тишь"
{"base_form": "тишь (f)", "translation": "calm, stillness", "meaning": "Отсутствие шума и движения, тишина."}

Sentence: "Он быстро бежал домой." Word: "быстро"
{"base_form": "быстро", "translation": "quickly", "meaning": "С большой скоростью, за короткое время."}

Sentence: "Я живу у моря." Word: "у"
{"base_form": "у (+gen)", "translation": "by, near, at", "meaning": "Указывает на нахождение рядом с чем-либо."}"#;

/// Stage 1: ask for the tagged base form only.
pub fn lemma_prompt(sentence: &str, word: &str) -> (String, String) {
    let system = format!(
        "You are an expert in Russian morphology. Given a sentence and a word from it, \
reply with the dictionary base form of the word as used in that sentence.\n\n{}\n\n\
Reply with the base form and its tag only, on a single line.",
        MORPHOLOGY_RULES
    );
    let user = format!("Sentence: \"{}\"\nWord: \"{}\"", sentence, word);
    (system, user)
}

/// Pick the English translation(s) that fit the sentence best.
pub fn translation_prompt(
    sentence: &str,
    word: &str,
    base_form: &str,
    candidates: &[String],
) -> (String, String) {
    let system = "You choose the English translation of a Russian word that fits its sentence best. \
Reply with the single best translation. If several candidates are equally apt, join them with \"; \". \
Reply on one line, copying candidates exactly, without numbering, quotes or any markup."
        .to_string();
    let user = format!(
        "Sentence: \"{}\"\nWord: \"{}\"\nBase form: \"{}\"\nCandidate translations:\n{}",
        sentence,
        word,
        base_form,
        numbered(candidates)
    );
    (system, user)
}

/// Pick the dictionary definition that matches the sense used in the sentence.
pub fn meaning_prompt(
    sentence: &str,
    word: &str,
    base_form: &str,
    candidates: &[String],
) -> (String, String) {
    let system = "You choose which dictionary definition of a Russian word matches the sense in which \
it is used in the sentence. Reply with exactly one of the candidate definitions, copied verbatim, \
without its number and without any other text."
        .to_string();
    let user = format!(
        "Sentence: \"{}\"\nWord: \"{}\"\nBase form: \"{}\"\nCandidate definitions:\n{}",
        sentence,
        word,
        base_form,
        numbered(candidates)
    );
    (system, user)
}

/// Write a definition from scratch when the dictionary had none.
pub fn meaning_generation_prompt(sentence: &str, word: &str, base_form: &str) -> (String, String) {
    let system = "You are a Russian lexicographer. Write a short dictionary-style definition, in Russian, \
of the given word in the sense it has in the sentence. Reply with the definition only, one sentence, \
no examples and no markup."
        .to_string();
    let user = format!(
        "Sentence: \"{}\"\nWord: \"{}\"\nBase form: \"{}\"",
        sentence, word, base_form
    );
    (system, user)
}

/// Last resort: base form, translation and meaning in a single call.
pub fn full_analysis_prompt(sentence: &str, word: &str) -> (String, String) {
    let system = format!(
        "You are an expert in Russian morphology and lexicography. For the given word in its sentence, \
produce its base form, its English translation in this context and a short Russian definition of \
this sense.\n\n{}\n\n{}\n\n\
Reply with a single JSON object with the keys \"base_form\", \"translation\" and \"meaning\". \
Output JSON only.",
        MORPHOLOGY_RULES, FULL_ANALYSIS_EXAMPLES
    );
    let user = format!("Sentence: \"{}\"\nWord: \"{}\"", sentence, word);
    (system, user)
}

fn numbered(candidates: &[String]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lemma_prompt_carries_rules_and_input() {
        let (system, user) = lemma_prompt("Я прочитал книгу", "прочитал");

        assert!(system.contains(MORPHOLOGY_RULES));
        assert!(user.contains("Я прочитал книгу"));
        assert!(user.contains("\"прочитал\""));
    }

    #[test]
    fn test_case_tags_are_for_prepositions_only() {
        let rule = |n: &str| {
            MORPHOLOGY_RULES
                .lines()
                .find(|l| l.starts_with(n))
                .unwrap()
        };

        let verbs = rule("4.");
        assert!(verbs.contains("(p)") && verbs.contains("(i)"));
        assert!(verbs.contains("exactly one"));
        assert!(!verbs.contains("(+"));

        let government = rule("5.");
        assert!(government.starts_with("5. Prepositions"));
        assert!(!government.contains("verb"));
        assert!(rule("6.").contains("at most one tag"));
    }

    #[test]
    fn test_candidates_are_numbered() {
        let candidates = vec!["read".to_string(), "peruse".to_string()];
        let (_, user) = translation_prompt("Я прочитал книгу", "прочитал", "прочитать (p)", &candidates);

        assert!(user.contains("1. read\n2. peruse"));
        assert!(user.contains("Base form: \"прочитать (p)\""));
    }

    #[test]
    fn test_meaning_prompt_lists_definitions() {
        let candidates = vec!["первое значение".to_string()];
        let (system, user) = meaning_prompt("s", "w", "b", &candidates);

        assert!(system.contains("verbatim"));
        assert!(user.ends_with("1. первое значение"));
    }

    #[test]
    fn test_full_analysis_prompt_has_examples() {
        let (system, _) = full_analysis_prompt("s", "w");

        assert!(system.contains("\"base_form\""));
        assert!(system.contains("тишь (f)"));
        assert!(system.contains(MORPHOLOGY_RULES));
    }
}
