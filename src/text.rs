//! Shared helpers for parsing the server's line-oriented object dumps.
//!
//! Every listing follows the same shape: an object is announced by a header
//! at column zero carrying its number (`Sink #59`, `Module #23`,
//! `Sink Input #227`), followed by one-tab-indented `Key: value` fields and
//! two-tab-indented `key = "value"` properties. Parsing is best-effort:
//! a block that does not yield the pieces a caller needs is skipped, never
//! an error, because garbled or truncated output is an expected condition.

/// Split a listing into per-object blocks of lines. A new block starts at
/// every line beginning with one of `headers` at column zero; text before
/// the first header is discarded.
pub(crate) fn split_blocks<'a>(output: &'a str, headers: &[&str]) -> Vec<Vec<&'a str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in output.lines() {
        let is_header = headers.iter().any(|h| line.starts_with(h));
        if is_header && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        if is_header || !current.is_empty() {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Extract the object number from a header line like `Source #12`.
pub(crate) fn header_id(line: &str) -> Option<u32> {
    line.split('#').nth(1)?.trim().parse().ok()
}

/// Find a one-tab-indented `Key: value` field within a block.
pub(crate) fn field<'a>(block: &[&'a str], key: &str) -> Option<&'a str> {
    let prefix = format!("\t{key}: ");
    block
        .iter()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(str::trim)
}

/// Find a `key = "value"` property line within a block and return the
/// unquoted value.
pub(crate) fn property<'a>(block: &[&'a str], key: &str) -> Option<&'a str> {
    let prefix = format!("{key} = \"");
    block.iter().find_map(|line| {
        line.trim_start()
            .strip_prefix(prefix.as_str())?
            .strip_suffix('"')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Sink #59\n\
        \tState: RUNNING\n\
        \tName: alsa_output.pci-0000_00_1f.3.analog-stereo\n\
        \tProperties:\n\
        \t\talsa.card = \"0\"\n\
        Sink #61\n\
        \tState: IDLE\n\
        \tName: bluez_output.speaker\n";

    #[test]
    fn test_split_blocks_on_headers() {
        let blocks = split_blocks(LISTING, &["Sink #"]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0][0], "Sink #59");
        assert_eq!(blocks[1][0], "Sink #61");
        assert_eq!(blocks[0].len(), 5);
    }

    #[test]
    fn test_split_blocks_discards_leading_noise() {
        let blocks = split_blocks("some banner\nSink #3\n\tName: x\n", &["Sink #"]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0][0], "Sink #3");
    }

    #[test]
    fn test_header_id() {
        assert_eq!(header_id("Sink #59"), Some(59));
        assert_eq!(header_id("Sink Input #227"), Some(227));
        assert_eq!(header_id("Sink #"), None);
        assert_eq!(header_id("garbage"), None);
    }

    #[test]
    fn test_field_lookup() {
        let blocks = split_blocks(LISTING, &["Sink #"]);
        assert_eq!(field(&blocks[0], "State"), Some("RUNNING"));
        assert_eq!(
            field(&blocks[0], "Name"),
            Some("alsa_output.pci-0000_00_1f.3.analog-stereo")
        );
        assert_eq!(field(&blocks[0], "Description"), None);
    }

    #[test]
    fn test_property_lookup() {
        let blocks = split_blocks(LISTING, &["Sink #"]);
        assert_eq!(property(&blocks[0], "alsa.card"), Some("0"));
        assert_eq!(property(&blocks[1], "alsa.card"), None);
    }
}
