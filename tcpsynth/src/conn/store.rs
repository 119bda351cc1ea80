use core::ops;
use core::slice;

/// The ordered record of every frame synthesized for a connection.
///
/// Frames are only ever appended. The order is the order of synthesis, which is the order in
/// which the frames are meant to be transmitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketStore {
    frames: Vec<Vec<u8>>,
}

/// Iterator over the frames of a [`PacketStore`].
///
/// [`PacketStore`]: struct.PacketStore.html
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    inner: slice::Iter<'a, Vec<u8>>,
}

impl PacketStore {
    /// An empty store.
    pub fn new() -> Self {
        PacketStore::default()
    }

    pub(crate) fn push(&mut self, frame: Vec<u8>) {
        self.frames.push(frame);
    }

    /// The number of recorded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if no frame was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The frame at `index`, in order of synthesis.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    /// The most recently recorded frame.
    pub fn last(&self) -> Option<&[u8]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Iterate over all frames in order of synthesis.
    pub fn iter(&self) -> Frames<'_> {
        Frames { inner: self.frames.iter() }
    }

    /// All frames in order of synthesis.
    pub fn as_slice(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Take the recorded frames.
    pub fn into_inner(self) -> Vec<Vec<u8>> {
        self.frames
    }
}

impl ops::Index<usize> for PacketStore {
    type Output = [u8];

    fn index(&self, index: usize) -> &[u8] {
        &self.frames[index]
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        self.inner.next().map(Vec::as_slice)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Frames<'_> {}

impl<'a> IntoIterator for &'a PacketStore {
    type Item = &'a [u8];
    type IntoIter = Frames<'a>;

    fn into_iter(self) -> Frames<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn append_only_order() {
        let mut store = PacketStore::new();
        assert!(store.is_empty());
        store.push(vec![1]);
        store.push(vec![2, 2]);
        store.push(vec![3, 3, 3]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(1), Some(&[2, 2][..]));
        assert_eq!(&store[2], &[3, 3, 3][..]);
        assert_eq!(store.last(), Some(&[3, 3, 3][..]));
        assert_eq!(store.get(3), None);
        let lens: Vec<_> = store.iter().map(<[u8]>::len).collect();
        assert_eq!(lens, [1, 2, 3]);
        assert_eq!(store.iter().len(), 3);
        assert_eq!(store.into_inner(), vec![vec![1], vec![2, 2], vec![3, 3, 3]]);
    }
}
