//! Input normalization for Japanese form input.
//!
//! Full-width (zenkaku) characters typed through an IME are folded to their
//! half-width ASCII forms before pattern checks run.

const FULL_WIDTH_OFFSET: u32 = 0xFEE0;

fn shift_to_ascii(c: char) -> char {
    char::from_u32(c as u32 - FULL_WIDTH_OFFSET).unwrap_or(c)
}

fn is_full_width_digit(c: char) -> bool {
    ('０'..='９').contains(&c)
}

fn is_full_width_letter(c: char) -> bool {
    ('Ａ'..='Ｚ').contains(&c) || ('ａ'..='ｚ').contains(&c)
}

/// Dash-like characters users type in place of a hyphen.
fn is_dash_variant(c: char) -> bool {
    matches!(c, 'ー' | '－' | '—' | '―')
}

/// Full-width digits to ASCII digits, dash variants to `-`, `．` and `。`
/// to `.`.
pub fn normalize_number(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if is_full_width_digit(c) {
                shift_to_ascii(c)
            } else if is_dash_variant(c) {
                '-'
            } else if matches!(c, '．' | '。') {
                '.'
            } else {
                c
            }
        })
        .collect()
}

/// Full-width Latin letters to ASCII letters.
pub fn normalize_alphabet(value: &str) -> String {
    value
        .chars()
        .map(|c| if is_full_width_letter(c) { shift_to_ascii(c) } else { c })
        .collect()
}

pub fn normalize_alphanumeric(value: &str) -> String {
    normalize_number(&normalize_alphabet(value))
}

/// Ideographic space (U+3000) to ASCII space.
pub fn normalize_space(value: &str) -> String {
    value.replace('\u{3000}', " ")
}

/// Full-width ASCII punctuation (`！` through `～`) to ASCII. Letters and digits
/// in the same block are left alone.
pub fn normalize_symbols(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if ('！'..='～').contains(&c) && !is_full_width_digit(c) && !is_full_width_letter(c) {
                shift_to_ascii(c)
            } else {
                c
            }
        })
        .collect()
}

/// Full-width forms of U+FF61..=U+FF9D, in code point order.
const HALF_WIDTH_KANA: &str = "。「」、・ヲァィゥェォャュョッーアイウエオカキクケコサシスセソタチツテトナニヌネノハヒフヘホマミムメモヤユヨラリルレロワン";

const VOICED_MARK: char = 'ﾞ';
const SEMI_VOICED_MARK: char = 'ﾟ';

fn widen_kana(c: char) -> Option<char> {
    let index = (c as u32).checked_sub(0xFF61)?;
    HALF_WIDTH_KANA.chars().nth(index as usize)
}

/// Compose a full-width kana with a following half-width sound mark.
fn compose(base: char, mark: char) -> Option<char> {
    let shift = match (mark, base) {
        (VOICED_MARK, 'ウ') => return Some('ヴ'),
        (VOICED_MARK, 'ワ') => return Some('ヷ'),
        (VOICED_MARK, 'ヲ') => return Some('ヺ'),
        (VOICED_MARK, _) if "カキクケコサシスセソタチツテトハヒフヘホ".contains(base) => 1,
        (SEMI_VOICED_MARK, _) if "ハヒフヘホ".contains(base) => 2,
        _ => return None,
    };
    char::from_u32(base as u32 + shift)
}

/// Half-width katakana (and half-width kana punctuation) to full-width.
///
/// A base followed by `ﾞ` or `ﾟ` becomes the single voiced form (`ｶﾞ` to
/// `ガ`). A sound mark with nothing to combine with is kept as is.
pub fn normalize_kana(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        let Some(wide) = widen_kana(c) else {
            out.push(c);
            continue;
        };
        match chars.peek().and_then(|&mark| compose(wide, mark)) {
            Some(voiced) => {
                out.push(voiced);
                chars.next();
            }
            None => out.push(wide),
        }
    }
    out
}

/// Trim ASCII and ideographic whitespace from both ends.
pub fn trim(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace())
}

/// Collapse every run of whitespace (including U+3000) into one ASCII space.
pub fn normalize_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_space = false;
    for c in value.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn normalize_tel(value: &str) -> String {
    strip_whitespace(&normalize_symbols(&normalize_alphanumeric(value)))
}

pub fn normalize_postal_code(value: &str) -> String {
    strip_whitespace(&normalize_symbols(&normalize_number(value)))
}

pub fn normalize_email(value: &str) -> String {
    let folded = normalize_symbols(&normalize_alphanumeric(value));
    trim(&folded).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_and_dashes() {
        assert_eq!(normalize_number("１２３－４５６７"), "123-4567");
        assert_eq!(normalize_number("０３ー１２３４—５６７８"), "03-1234-5678");
        assert_eq!(normalize_number("０１２３"), "0123");
        assert_eq!(normalize_number("abc"), "abc");
        assert_eq!(normalize_number("１．５"), "1.5");
        assert_eq!(normalize_number("３。１４"), "3.14");
    }

    #[test]
    fn half_width_kana() {
        assert_eq!(normalize_kana("ｶﾞｷﾞｸﾞ"), "ガギグ");
        assert_eq!(normalize_kana("ﾊﾟﾋﾟﾌﾟﾍﾟﾎﾟ"), "パピプペポ");
        assert_eq!(normalize_kana("ｳﾞｧｲｵﾘﾝ"), "ヴァイオリン");
        assert_eq!(normalize_kana("ﾜﾞｦﾞ"), "ヷヺ");
        assert_eq!(normalize_kana("ｺｰﾋｰ｡"), "コーヒー。");
        assert_eq!(normalize_kana("｢ﾃｽﾄ｣､･"), "「テスト」、・");
        assert_eq!(normalize_kana("ﾂﾞﾄﾞ"), "ヅド");
        // Marks that cannot combine stay unchanged.
        assert_eq!(normalize_kana("ｱﾞﾏﾟ"), "アﾞマﾟ");
        assert_eq!(normalize_kana("ﾞabc"), "ﾞabc");
        assert_eq!(normalize_kana("ガ漢字"), "ガ漢字");
    }

    #[test]
    fn letters_and_symbols() {
        assert_eq!(normalize_alphabet("Ａｂｃ１"), "Abc１");
        assert_eq!(normalize_alphanumeric("Ａ１"), "A1");
        assert_eq!(normalize_symbols("（０３）＠！"), "(０３)@!");
    }

    #[test]
    fn whitespace_handling() {
        assert_eq!(normalize_space("山田\u{3000}太郎"), "山田 太郎");
        assert_eq!(trim("\u{3000} abc \u{3000}"), "abc");
        assert_eq!(normalize_whitespace("a \u{3000}  b\tc"), "a b c");
    }

    #[test]
    fn composite_normalizers() {
        assert_eq!(normalize_tel("０３ ー １２３４ ー ５６７８"), "03-1234-5678");
        assert_eq!(normalize_postal_code("１２３ － ４５６７"), "123-4567");
        assert_eq!(normalize_email("  Ｕｓｅｒ＠Ｅｘａｍｐｌｅ．ｃｏｍ "), "user@example.com");
    }
}
