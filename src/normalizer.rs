//! Filename normalization
//!
//! Maps arbitrary metadata text (episode titles, show names) to a string that
//! is safe to use as a path component on every common filesystem.

/// Characters that survive normalization unchanged.
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, ' ' | '.' | ',' | '\'' | '"' | '(' | ')' | '&' | '!' | '-')
}

/// Normalizes text for use in a generated filename
///
/// The rules are applied in order:
/// 1. Accented Latin letters are folded to their base ASCII letter
/// 2. Typographic punctuation is mapped to a plain ASCII equivalent
/// 3. Characters reserved by filesystems (`: / \ * < > |`) become `-`
/// 4. Anything else outside the allow-list becomes `?`
///
/// The result is trimmed. Calling `normalize` on its own output returns
/// the output unchanged.
///
/// # Examples
///
/// ```
/// use media_sleuth::normalize;
///
/// assert_eq!(normalize("Finalé"), "Finale");
/// assert_eq!(normalize("jkhjk:/!sfdgg"), "jkhjk--.sfdgg");
/// ```
pub fn normalize(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        if let Some(folded) = fold_latin(c) {
            result.push_str(folded);
        } else if let Some(plain) = plain_punctuation(c) {
            result.push_str(plain);
        } else if is_reserved(c) {
            result.push('-');
        } else if is_allowed(c) {
            result.push(c);
        } else {
            result.push('?');
        }
    }

    result.trim().to_string()
}

fn is_reserved(c: char) -> bool {
    matches!(c, ':' | '/' | '\\' | '*' | '<' | '>' | '|')
}

/// Smart punctuation and other characters with a fixed ASCII replacement.
fn plain_punctuation(c: char) -> Option<&'static str> {
    let plain = match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '`' | '\u{00B4}' => "'",
        // Double quotes are not portable in filenames
        '"' | '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => "'",
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' => "-",
        '\u{2026}' => "...",
        '\u{00A0}' | '\u{2002}' | '\u{2003}' | '\u{2009}' => " ",
        '!' => ".",
        _ => return None,
    };
    Some(plain)
}

/// Folds an accented Latin letter to its unaccented ASCII form.
///
/// Covers Latin-1 Supplement and Latin Extended-A. Returns `None` for
/// characters that are not accented Latin letters.
fn fold_latin(c: char) -> Option<&'static str> {
    let upper = c.is_uppercase();
    let pick = |u: &'static str, l: &'static str| Some(if upper { u } else { l });

    match c {
        'À'..='Å' | 'à'..='å' | 'Ā'..='ą' => pick("A", "a"),
        'Æ' | 'æ' => pick("AE", "ae"),
        'Ç' | 'ç' | 'Ć'..='č' => pick("C", "c"),
        'Ð' | 'ð' | 'Ď'..='đ' => pick("D", "d"),
        'È'..='Ë' | 'è'..='ë' | 'Ē'..='ě' => pick("E", "e"),
        'Ĝ'..='ģ' => pick("G", "g"),
        'Ĥ'..='ħ' => pick("H", "h"),
        'Ì'..='Ï' | 'ì'..='ï' | 'Ĩ'..='ı' => pick("I", "i"),
        'Ĳ' | 'ĳ' => pick("IJ", "ij"),
        'Ĵ' | 'ĵ' => pick("J", "j"),
        'Ķ'..='ĸ' => pick("K", "k"),
        'Ĺ'..='ł' => pick("L", "l"),
        'Ñ' | 'ñ' | 'Ń'..='ŋ' => pick("N", "n"),
        'Ò'..='Ö' | 'Ø' | 'ò'..='ö' | 'ø' | 'Ō'..='ő' => pick("O", "o"),
        'Œ' | 'œ' => pick("OE", "oe"),
        'Ŕ'..='ř' => pick("R", "r"),
        'Ś'..='š' | 'ſ' => pick("S", "s"),
        'ß' => Some("ss"),
        'Ţ'..='ŧ' => pick("T", "t"),
        'Þ' | 'þ' => pick("TH", "th"),
        'Ù'..='Ü' | 'ù'..='ü' | 'Ũ'..='ų' => pick("U", "u"),
        'Ŵ' | 'ŵ' => pick("W", "w"),
        'Ý' | 'ý' | 'ÿ' | 'Ŷ'..='Ÿ' => pick("Y", "y"),
        'Ź'..='ž' => pick("Z", "z"),
        _ => None,
    }
}
