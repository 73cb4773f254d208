//! Natural-key normalization and currency rounding helpers.

/// Normalizes a display name into the slug used as a natural key.
///
/// Lowercases, folds Latin diacritics to ASCII, and collapses runs of
/// non-alphanumeric characters into single spaces. Computed once at write
/// time and reused for every subsequent comparison.
pub fn name_code(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.chars() {
        let ch = fold_diacritic(ch).to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}

fn fold_diacritic(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        _ => ch,
    }
}

/// Rounds a monetary amount to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_code_folds_case_and_diacritics() {
        assert_eq!(name_code("Água e Luz"), "agua e luz");
        assert_eq!(name_code("Cartão de Crédito"), "cartao de credito");
        assert_eq!(name_code("  Personal   Pix  Nubank "), "personal pix nubank");
    }

    #[test]
    fn name_code_collapses_punctuation() {
        assert_eq!(name_code("Condomínio - Bloco B!"), "condominio bloco b");
        assert_eq!(name_code("***"), "");
    }

    #[test]
    fn round2_rounds_at_cents() {
        assert_eq!(round2(33.333), 33.33);
        assert_eq!(round2(33.335), 33.34);
        assert_eq!(round2(270.0), 270.0);
    }
}
