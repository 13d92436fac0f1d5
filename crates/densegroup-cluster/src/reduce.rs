/// Combine `items` pairwise, level by level, until one value remains.
///
/// Adjacent items are reduced first (`[a, b, c, d, e]` becomes `[ab, cd, e]`, then
/// `[abcd, e]`), giving a reduction tree of depth `ceil(log2(n))`. Returns `None` for an empty
/// input.
pub fn pairwise_reduce<T>(mut items: Vec<T>, mut op: impl FnMut(T, T) -> T) -> Option<T> {
    while items.len() > 1 {
        let mut next = Vec::with_capacity(items.len().div_ceil(2));
        let mut iter = items.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => next.push(op(left, right)),
                None => next.push(left),
            }
        }
        items = next;
    }
    items.pop()
}
