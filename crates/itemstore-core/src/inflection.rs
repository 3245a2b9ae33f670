//! English noun inflection.
//!
//! Three layers, checked in this order:
//! - uncountable words and patterns, which never change
//! - irregular singular/plural pairs
//! - suffix rules, where later entries in a table take precedence
//!
//! Matching is done on the lowercased word; the result gets the casing of the
//! input back (all lower, all upper or capitalized).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Irregular pairs as `(singular, plural)`.
const IRREGULARS: &[(&str, &str)] = &[
    ("echo", "echoes"),
    ("dingo", "dingoes"),
    ("volcano", "volcanoes"),
    ("tornado", "tornadoes"),
    ("torpedo", "torpedoes"),
    ("genus", "genera"),
    ("viscus", "viscera"),
    ("stigma", "stigmata"),
    ("stoma", "stomata"),
    ("dogma", "dogmata"),
    ("lemma", "lemmata"),
    ("schema", "schemata"),
    ("anathema", "anathemata"),
    ("ox", "oxen"),
    ("axe", "axes"),
    ("die", "dice"),
    ("yes", "yeses"),
    ("foot", "feet"),
    ("eave", "eaves"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("quiz", "quizzes"),
    ("human", "humans"),
    ("proof", "proofs"),
    ("carve", "carves"),
    ("valve", "valves"),
    ("looey", "looies"),
    ("thief", "thieves"),
    ("groove", "grooves"),
    ("pickaxe", "pickaxes"),
    ("passerby", "passersby"),
    ("canvas", "canvases"),
    ("cache", "caches"),
];

/// Singular to plural suffix rules.
const PLURAL_RULES: &[(&str, &str)] = &[
    (r"s?$", "s"),
    (r"[^\x00-\x7F]$", "${0}"),
    (r"([^aeiou]ese)$", "${1}"),
    (r"(ax|test)is$", "${1}es"),
    (r"(alias|[^aou]us|t[lm]as|gas|ris)$", "${1}es"),
    (r"(e[mn]u)s?$", "${1}s"),
    (r"([^l]ias|[aeiou]las|[ejzr]as|[iu]am)$", "${1}"),
    (
        r"(alumn|syllab|vir|radi|nucle|fung|cact|stimul|termin|bacill|foc|uter|loc|strat)(?:us|i)$",
        "${1}i",
    ),
    (r"(alumn|alg|vertebr)(?:a|ae)$", "${1}ae"),
    (r"(seraph|cherub)(?:im)?$", "${1}im"),
    (r"(her|at|gr)o$", "${1}oes"),
    (
        r"(agend|addend|millenni|dat|extrem|bacteri|desiderat|strat|candelabr|errat|ov|symposi|curricul|automat|quor)(?:a|um)$",
        "${1}a",
    ),
    (
        r"(apheli|hyperbat|periheli|asyndet|noumen|phenomen|criteri|organ|prolegomen|hedr|automat)(?:a|on)$",
        "${1}a",
    ),
    (r"sis$", "ses"),
    (r"(?:(kni|wi|li)fe|(ar|l|ea|eo|oa|hoo)f)$", "${1}${2}ves"),
    (r"([^aeiouy]|qu)y$", "${1}ies"),
    (r"([^ch][ieo][ln])ey$", "${1}ies"),
    (r"(x|ch|ss|sh|zz)$", "${1}es"),
    (r"(matr|cod|mur|sil|vert|ind|append)(?:ix|ex)$", "${1}ices"),
    (r"\b((?:tit)?m|l)(?:ice|ouse)$", "${1}ice"),
    (r"(pe)(?:rson|ople)$", "${1}ople"),
    (r"(child)(?:ren)?$", "${1}ren"),
    (r"eaux$", "${0}"),
    (r"m[ae]n$", "men"),
];

/// Plural to singular suffix rules.
const SINGULAR_RULES: &[(&str, &str)] = &[
    (r"s$", ""),
    (r"(ss)$", "${1}"),
    (
        r"(wi|kni|(?:after|half|high|low|mid|non|night|[^\w]|^)li)ves$",
        "${1}fe",
    ),
    (r"(ar|(?:wo|[ae])l|[eo][ao])ves$", "${1}f"),
    (r"ies$", "y"),
    (
        r"(dg|ss|ois|lk|ok|wn|mb|th|ch|ec|oal|is|ck|ix|sser|ts|wb)ies$",
        "${1}ie",
    ),
    (
        r"\b(l|(?:neck|cross|hog|aun)?t|coll|faer|food|gen|goon|group|hipp|junk|vegg|(?:pork)?p|charl|calor|cut)ies$",
        "${1}ie",
    ),
    (r"\b(mon|smil)ies$", "${1}ey"),
    (r"\b((?:tit)?m|l)ice$", "${1}ouse"),
    (r"(seraph|cherub)im$", "${1}"),
    (
        r"(x|ch|ss|sh|zz|tto|go|cho|alias|[^aou]us|t[lm]as|gas|(?:her|at|gr)o|[aeiou]ris)(?:es)?$",
        "${1}",
    ),
    (
        r"(analy|diagno|parenthe|progno|synop|the|empha|cri|ne)(?:sis|ses)$",
        "${1}sis",
    ),
    (r"(movie|twelve|abuse|e[mn]u)s$", "${1}"),
    (r"(test)(?:is|es)$", "${1}is"),
    (
        r"(alumn|syllab|vir|radi|nucle|fung|cact|stimul|termin|bacill|foc|uter|loc|strat)(?:us|i)$",
        "${1}us",
    ),
    (
        r"(agend|addend|millenni|dat|extrem|bacteri|desiderat|strat|candelabr|errat|ov|symposi|curricul|quor)a$",
        "${1}um",
    ),
    (
        r"(apheli|hyperbat|periheli|asyndet|noumen|phenomen|criteri|organ|prolegomen|hedr|automat)a$",
        "${1}on",
    ),
    (r"(alumn|alg|vertebr)ae$", "${1}a"),
    (r"(cod|mur|sil|vert|ind)ices$", "${1}ex"),
    (r"(matr|append)ices$", "${1}ix"),
    (r"(pe)(rson|ople)$", "${1}rson"),
    (r"(child)ren$", "${1}"),
    (r"(eau)x?$", "${1}"),
    (r"men$", "man"),
];

const UNCOUNTABLE_WORDS: &[&str] = &[
    "adulthood", "advice", "agenda", "aid", "aircraft", "alcohol", "ammo", "analytics", "anime",
    "athletics", "audio", "bison", "blood", "bream", "buffalo", "butter", "carp", "cash",
    "chassis", "chess", "clothing", "cod", "commerce", "cooperation", "corps", "debris",
    "diabetes", "digestion", "elk", "energy", "equipment", "excretion", "expertise", "firmware",
    "flounder", "fun", "gallows", "garbage", "graffiti", "hardware", "headquarters", "health",
    "herpes", "highjinks", "homework", "housework", "information", "jeans", "justice", "kudos",
    "labour", "literature", "machinery", "mackerel", "mail", "media", "mews", "moose", "music",
    "mud", "manga", "news", "personnel", "pike", "plankton", "pliers", "police", "pollution",
    "premises", "rain", "research", "rice", "salmon", "scissors", "series", "sewage",
    "shambles", "shrimp", "software", "staff", "swine", "tennis", "traffic", "transportation",
    "trout", "tuna", "wealth", "welfare", "whiting", "wildebeest", "wildlife",
];

const UNCOUNTABLE_PATTERNS: &[&str] = &[
    r"pok[eé]mon$",
    r"[^aeiou]ese$",
    r"deer$",
    r"fish$",
    r"measles$",
    r"o[iu]s$",
    r"pox$",
    r"sheep$",
];

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

/// Rules in precedence order, uncountable patterns first.
fn compile(table: &[(&'static str, &'static str)]) -> Vec<Rule> {
    let uncountable = UNCOUNTABLE_PATTERNS.iter().map(|p| (*p, "${0}"));
    uncountable
        .chain(table.iter().rev().copied())
        .map(|(pattern, replacement)| Rule {
            pattern: Regex::new(pattern).expect("valid inflection rule"),
            replacement,
        })
        .collect()
}

static PLURALS: Lazy<Vec<Rule>> = Lazy::new(|| compile(PLURAL_RULES));
static SINGULARS: Lazy<Vec<Rule>> = Lazy::new(|| compile(SINGULAR_RULES));
static UNCOUNTABLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| UNCOUNTABLE_WORDS.iter().copied().collect());
static PLURAL_OF: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| IRREGULARS.iter().copied().collect());
static SINGULAR_OF: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| IRREGULARS.iter().map(|&(s, p)| (p, s)).collect());

/// Plural form of `word`.
pub fn plural(word: &str) -> String {
    inflect(word, &PLURAL_OF, &SINGULAR_OF, &PLURALS)
}

/// Singular form of `word`.
pub fn singular(word: &str) -> String {
    inflect(word, &SINGULAR_OF, &PLURAL_OF, &SINGULARS)
}

/// Whether `word` is a plural form. Uncountable words are.
pub fn is_plural(word: &str) -> bool {
    let token = word.to_lowercase();
    if token.is_empty() {
        return false;
    }
    if SINGULAR_OF.contains_key(token.as_str()) {
        return true;
    }
    if PLURAL_OF.contains_key(token.as_str()) {
        return false;
    }
    apply_rules(&token, &PLURALS) == token
}

fn inflect(
    word: &str,
    replace: &HashMap<&str, &str>,
    keep: &HashMap<&str, &str>,
    rules: &[Rule],
) -> String {
    let token = word.to_lowercase();
    if keep.contains_key(token.as_str()) {
        return restore_case(word, &token);
    }
    if let Some(irregular) = replace.get(token.as_str()) {
        return restore_case(word, irregular);
    }
    restore_case(word, &apply_rules(&token, rules))
}

fn apply_rules(token: &str, rules: &[Rule]) -> String {
    if token.is_empty() || UNCOUNTABLES.contains(token) {
        return token.to_string();
    }
    rules
        .iter()
        .find(|rule| rule.pattern.is_match(token))
        .map_or_else(
            || token.to_string(),
            |rule| rule.pattern.replace(token, rule.replacement).into_owned(),
        )
}

fn restore_case(word: &str, token: &str) -> String {
    if word == word.to_lowercase() {
        return token.to_lowercase();
    }
    if word == word.to_uppercase() {
        return token.to_uppercase();
    }
    if word.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = token.chars();
        return chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        });
    }
    token.to_lowercase()
}
