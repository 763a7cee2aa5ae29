use std::borrow::Cow;

/// A TEXT resource: a list of NUL-terminated strings.
#[derive(Debug)]
pub struct Text {
    items: Vec<Vec<u8>>,
}

impl Text {
    pub fn new(data: &[u8]) -> Self {
        let mut items: Vec<Vec<u8>> = data.split(|&b| b == 0).map(<[u8]>::to_vec).collect();
        // The final terminator leaves an empty tail behind
        if items.last().is_some_and(Vec::is_empty) {
            items.pop();
        }
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_item(&self, index: usize) -> Option<&[u8]> {
        self.items.get(index).map(Vec::as_slice)
    }

    pub fn get_string(&self, index: usize) -> Option<Cow<'_, str>> {
        self.get_item(index).map(String::from_utf8_lossy)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.items.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_nul() {
        let text = Text::new(b"Hello\0\0World\0");
        assert_eq!(text.len(), 3);
        assert_eq!(text.get_item(0), Some(&b"Hello"[..]));
        assert_eq!(text.get_item(1), Some(&b""[..]));
        assert_eq!(text.get_string(2).as_deref(), Some("World"));
        assert_eq!(text.get_item(3), None);
    }

    #[test]
    fn unterminated_tail_is_kept() {
        let text = Text::new(b"a\0b");
        assert_eq!(text.iter().collect::<Vec<_>>(), vec![&b"a"[..], &b"b"[..]]);
    }
}
