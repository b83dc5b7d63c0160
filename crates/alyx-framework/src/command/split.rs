/// Splits command text into tokens, treating double-quoted spans as one token.
///
/// - Tokens are separated by whitespace.
/// - `"..."` becomes a single token with the wrapping quotes stripped and the
///   inner text kept verbatim, so `""` yields an empty token and `"  "` a
///   token of two spaces.
/// - A trailing `"` on a bare word is stripped (`foo"` → `foo`).
/// - A `"` with no closing partner is dropped and the text after it is read
///   as a bare word.
pub fn split_with_quotes(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = input.trim();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        if let Some(quoted) = rest.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => {
                    tokens.push(quoted[..end].to_string());
                    rest = &quoted[end + 1..];
                }
                None => rest = quoted,
            }
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..end];
        tokens.push(word.strip_suffix('"').unwrap_or(word).to_string());
        rest = &rest[end..];
    }

    tokens
}
