use std::cmp::Ordering;
use std::iter::Peekable;

/// Pairs up equal keys of two sorted iterators in a single forward pass.
///
/// Each element is used at most once: on a match both sides advance, so a
/// key repeated on one side pairs only with the first equal element of the
/// other.
pub struct MergeJoin<L: Iterator, R: Iterator, F> {
    left: Peekable<L>,
    right: Peekable<R>,
    cmp: F,
}

pub fn merge_join<L, R, F>(left: L, right: R, cmp: F) -> MergeJoin<L::IntoIter, R::IntoIter, F>
where
    L: IntoIterator,
    R: IntoIterator,
    F: FnMut(&L::Item, &R::Item) -> Ordering,
{
    MergeJoin {
        left: left.into_iter().peekable(),
        right: right.into_iter().peekable(),
        cmp,
    }
}

impl<L, R, F> Iterator for MergeJoin<L, R, F>
where
    L: Iterator,
    R: Iterator,
    F: FnMut(&L::Item, &R::Item) -> Ordering,
{
    type Item = (L::Item, R::Item);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let ordering = match (self.left.peek(), self.right.peek()) {
                (Some(l), Some(r)) => (self.cmp)(l, r),
                _ => return None,
            };
            match ordering {
                Ordering::Less => {
                    self.left.next();
                }
                Ordering::Greater => {
                    self.right.next();
                }
                Ordering::Equal => {
                    let l = self.left.next()?;
                    let r = self.right.next()?;
                    return Some((l, r));
                }
            }
        }
    }
}
