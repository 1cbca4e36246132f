/// Collects download fragments in arrival order.
///
/// Fragments carry no sequence numbers; the transport delivers them in
/// order and the assembler keeps that order.
#[derive(Debug, Default)]
pub struct FragmentAssembler {
    fragments: Vec<Vec<u8>>,
    total_len: usize,
}

impl FragmentAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one fragment.
    pub fn push(&mut self, fragment: Vec<u8>) {
        self.total_len += fragment.len();
        self.fragments.push(fragment);
    }

    /// Number of fragments received so far.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Total bytes received so far.
    pub fn len(&self) -> usize {
        self.total_len
    }

    /// Returns `true` if no payload bytes were received.
    pub fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    /// Concatenates all fragments into a single buffer.
    pub fn assemble(self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.total_len);
        for fragment in self.fragments {
            blob.extend_from_slice(&fragment);
        }
        blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_assembler() {
        let asm = FragmentAssembler::new();
        assert!(asm.is_empty());
        assert_eq!(asm.fragment_count(), 0);
        assert!(asm.assemble().is_empty());
    }

    #[test]
    fn keeps_arrival_order() {
        let mut asm = FragmentAssembler::new();
        asm.push(b"The quick ".to_vec());
        asm.push(b"brown fox".to_vec());
        asm.push(Vec::new());
        asm.push(b" jumps".to_vec());

        assert_eq!(asm.fragment_count(), 4);
        assert_eq!(asm.len(), 25);
        assert_eq!(asm.assemble(), b"The quick brown fox jumps");
    }

    #[test]
    fn sizes_add_up() {
        let mut asm = FragmentAssembler::new();
        asm.push(vec![1u8; 4096]);
        asm.push(vec![2u8; 2048]);
        assert_eq!(asm.len(), 6144);

        let blob = asm.assemble();
        assert_eq!(blob.len(), 6144);
        assert!(blob[..4096].iter().all(|&b| b == 1));
        assert!(blob[4096..].iter().all(|&b| b == 2));
    }
}
