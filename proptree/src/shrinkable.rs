//! Values paired with lazy trees of simpler candidates.
//!
//! A [`Shrinkable`] holds a generated value and a thunk producing its
//! children. Children are only built when a shrink search asks for them,
//! so trees may be arbitrarily large (or infinite) without cost.

use std::fmt;
use std::rc::Rc;

/// Ordered stream of shrink candidates, simplest first
pub type Shrinks<T> = Box<dyn Iterator<Item = Shrinkable<T>>>;

type ShrinkFn<T> = Rc<dyn Fn() -> Shrinks<T>>;

/// A value together with its ordered, lazily produced shrink candidates
pub struct Shrinkable<T> {
    value: T,
    shrinks: ShrinkFn<T>,
}

impl<T: Clone> Clone for Shrinkable<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            shrinks: Rc::clone(&self.shrinks),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Shrinkable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shrinkable").field(&self.value).finish()
    }
}

impl<T: Clone + 'static> Shrinkable<T> {
    /// A value with no shrink candidates
    pub fn new(value: T) -> Self {
        Self {
            value,
            shrinks: Rc::new(|| Box::new(std::iter::empty())),
        }
    }

    /// Replace the children of this node with the stream produced by `f`
    pub fn with_shrinks<F, I>(self, f: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = Shrinkable<T>>,
        I::IntoIter: 'static,
    {
        Self {
            value: self.value,
            shrinks: Rc::new(move || Box::new(f().into_iter())),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Produce a fresh iterator over this node's children
    pub fn shrinks(&self) -> Shrinks<T> {
        (self.shrinks)()
    }

    pub fn has_shrinks(&self) -> bool {
        self.shrinks().next().is_some()
    }

    /// Transform the value and, lazily, every node below it
    pub fn map<U, F>(self, f: F) -> Shrinkable<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        map_with(self, Rc::new(f))
    }

    /// Keep only nodes satisfying `pred`.
    ///
    /// Returns `None` when the root itself is rejected. A rejected child is
    /// pruned together with its whole subtree.
    pub fn filter<P>(self, pred: P) -> Option<Self>
    where
        P: Fn(&T) -> bool + 'static,
    {
        filter_with(self, Rc::new(pred))
    }

    /// Bind a dependent shrinkable onto this one.
    ///
    /// The resulting node's children are first this node's own shrinks, each
    /// re-bound through `f`, followed by the shrinks of the dependent value
    /// with this value held fixed.
    pub fn and_then<U, F>(self, f: F) -> Shrinkable<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> Shrinkable<U> + 'static,
    {
        let f = Rc::new(f);
        let dependent = f(&self.value);
        bind_onto(self, dependent, Rc::new(move |value: &T| Some(f(value))))
    }

    /// Like [`Shrinkable::and_then`], but `f` may decline a candidate.
    ///
    /// Declined outer candidates are dropped from the child stream. Returns
    /// `None` when `f` declines the root.
    pub fn try_and_then<U, F>(self, f: F) -> Option<Shrinkable<U>>
    where
        U: Clone + 'static,
        F: Fn(&T) -> Option<Shrinkable<U>> + 'static,
    {
        bind_with(self, Rc::new(f))
    }

    // `try_and_then` with the root's dependent value already computed.
    pub(crate) fn bind_from<U>(
        self,
        dependent: Shrinkable<U>,
        f: Rc<dyn Fn(&T) -> Option<Shrinkable<U>>>,
    ) -> Shrinkable<U>
    where
        U: Clone + 'static,
    {
        bind_onto(self, dependent, f)
    }

    /// Cap the branching factor of every node in the tree at `n`
    pub fn take(self, n: usize) -> Self {
        let inner = self.shrinks;
        Self {
            value: self.value,
            shrinks: Rc::new(move || Box::new(inner().take(n).map(move |child| child.take(n)))),
        }
    }

    /// Insert candidates before this node's own children, at the root only
    pub fn prepend_static<F, I>(self, first: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = Shrinkable<T>>,
        I::IntoIter: 'static,
    {
        let inner = self.shrinks;
        Self {
            value: self.value,
            shrinks: Rc::new(move || Box::new(first().into_iter().chain(inner()))),
        }
    }

    /// Append candidates after this node's own children, at the root only
    pub fn concat_static<F, I>(self, more: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = Shrinkable<T>>,
        I::IntoIter: 'static,
    {
        let inner = self.shrinks;
        Self {
            value: self.value,
            shrinks: Rc::new(move || Box::new(inner().chain(more()))),
        }
    }
}

fn map_with<T, U>(source: Shrinkable<T>, f: Rc<dyn Fn(&T) -> U>) -> Shrinkable<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let value = f(&source.value);
    let inner = source.shrinks;
    Shrinkable {
        value,
        shrinks: Rc::new(move || {
            let f = Rc::clone(&f);
            Box::new(inner().map(move |child| map_with(child, Rc::clone(&f))))
        }),
    }
}

fn filter_with<T>(source: Shrinkable<T>, pred: Rc<dyn Fn(&T) -> bool>) -> Option<Shrinkable<T>>
where
    T: Clone + 'static,
{
    if !pred(&source.value) {
        return None;
    }
    let inner = source.shrinks;
    Some(Shrinkable {
        value: source.value,
        shrinks: Rc::new(move || {
            let pred = Rc::clone(&pred);
            Box::new(inner().filter_map(move |child| filter_with(child, Rc::clone(&pred))))
        }),
    })
}

fn bind_with<T, U>(
    outer: Shrinkable<T>,
    f: Rc<dyn Fn(&T) -> Option<Shrinkable<U>>>,
) -> Option<Shrinkable<U>>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let dependent = f(&outer.value)?;
    Some(bind_onto(outer, dependent, f))
}

fn bind_onto<T, U>(
    outer: Shrinkable<T>,
    dependent: Shrinkable<U>,
    f: Rc<dyn Fn(&T) -> Option<Shrinkable<U>>>,
) -> Shrinkable<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let outer_shrinks = outer.shrinks;
    let dependent_shrinks = dependent.shrinks;
    Shrinkable {
        value: dependent.value,
        shrinks: Rc::new(move || {
            let f = Rc::clone(&f);
            let fixed = Rc::clone(&dependent_shrinks);
            Box::new(
                outer_shrinks()
                    .filter_map(move |candidate| bind_with(candidate, Rc::clone(&f)))
                    .chain(std::iter::once(()).flat_map(move |_| fixed())),
            )
        }),
    }
}

/// Helpers for inspecting shrink trees in tests.
pub mod testing {
    use super::Shrinkable;
    use std::fmt;

    /// A fully materialized slice of a shrink tree
    #[derive(Debug, Clone, PartialEq)]
    pub struct Tree<T> {
        pub value: T,
        pub children: Vec<Tree<T>>,
    }

    impl<T: fmt::Display> fmt::Display for Tree<T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.value)?;
            if !self.children.is_empty() {
                write!(f, "[")?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "]")?;
            }
            Ok(())
        }
    }

    /// Materialize `root` down to `depth` levels below it
    pub fn collect_tree<T: Clone + 'static>(root: &Shrinkable<T>, depth: usize) -> Tree<T> {
        let children = if depth == 0 {
            Vec::new()
        } else {
            root.shrinks()
                .map(|child| collect_tree(&child, depth - 1))
                .collect()
        };
        Tree {
            value: root.value().clone(),
            children,
        }
    }

    /// Visit every root-to-node path up to `depth`, calling `visit` with the
    /// values along the path (root first)
    pub fn for_each_path<T, F>(root: &Shrinkable<T>, depth: usize, visit: &mut F)
    where
        T: Clone + 'static,
        F: FnMut(&[T]),
    {
        let mut path = vec![root.value().clone()];
        walk(root, depth, &mut path, visit);
    }

    fn walk<T, F>(node: &Shrinkable<T>, depth: usize, path: &mut Vec<T>, visit: &mut F)
    where
        T: Clone + 'static,
        F: FnMut(&[T]),
    {
        visit(path.as_slice());
        if depth == 0 {
            return;
        }
        for child in node.shrinks() {
            path.push(child.value().clone());
            walk(&child, depth - 1, path, visit);
            path.pop();
        }
    }
}
