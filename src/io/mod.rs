//! Text persistence for trained models.
//!
//! The format is a flat, order-sensitive stream of whitespace-separated
//! tokens:
//!
//! ```text
//! vector          := len value*
//! feature binning := n_levels vector
//! cut             := feature index valid(0|1) gain
//! tree            := n_cuts cut* purities-vector boost-weights-vector
//! forest          := f0 shrinkage binnings-vector trees-vector
//! ```
//!
//! Floats are written in Rust's shortest round-trip decimal form, so
//! `read(write(forest))` reproduces every field exactly. The reader is
//! strict: missing tokens, malformed tokens, inconsistent counts and
//! trailing garbage are all [`FormatError`]s.

use std::fmt::Display;
use std::io::{self, Write};
use std::str::{FromStr, SplitWhitespace};

use crate::binning::{BinValue, FeatureBinning};
use crate::repr::{Cut, Forest, Tree};

// =============================================================================
// FormatError
// =============================================================================

/// Errors produced by the strict persistence reader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The stream ended while another token was required.
    #[error("unexpected end of input while reading {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// A token could not be parsed as the required type.
    #[error("invalid token {token:?} while reading {expected}")]
    InvalidToken { expected: &'static str, token: String },

    /// A length field disagrees with the following data.
    #[error("count mismatch in {what}: expected {expected}, got {got}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Tokens remained after the top-level value was fully read.
    #[error("trailing data after {token:?}")]
    TrailingData { token: String },
}

// =============================================================================
// Writing
// =============================================================================

/// Write a vector as `len value*`.
pub fn write_vector<V: Display, W: Write>(values: &[V], writer: &mut W) -> io::Result<()> {
    write!(writer, "{}", values.len())?;
    for value in values {
        write!(writer, " {value}")?;
    }
    writeln!(writer)
}

/// Write a feature binning as `n_levels` followed by its boundary vector.
pub fn write_binning<T: Display, W: Write>(
    binning: &FeatureBinning<T>,
    writer: &mut W,
) -> io::Result<()>
where
    T: BinValue,
{
    writeln!(writer, "{}", binning.n_levels())?;
    write_vector(binning.binning(), writer)
}

/// Write a cut as `feature index valid gain`.
pub fn write_cut<W: Write>(cut: &Cut, writer: &mut W) -> io::Result<()> {
    writeln!(
        writer,
        "{} {} {} {}",
        cut.feature,
        cut.index,
        u8::from(cut.valid),
        cut.gain
    )
}

/// Write a tree: cut count, cuts, purity vector, boost-weight vector.
pub fn write_tree<W: Write>(tree: &Tree, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{}", tree.cuts().len())?;
    for cut in tree.cuts() {
        write_cut(cut, writer)?;
    }
    write_vector(tree.purities(), writer)?;
    write_vector(tree.boost_weights(), writer)
}

/// Write a forest: `f0 shrinkage`, binnings, trees.
pub fn write_forest<T, W: Write>(forest: &Forest<T>, writer: &mut W) -> io::Result<()>
where
    T: BinValue + Display,
{
    writeln!(writer, "{} {}", forest.f0(), forest.shrinkage())?;
    writeln!(writer, "{}", forest.binnings().len())?;
    for binning in forest.binnings() {
        write_binning(binning, writer)?;
    }
    writeln!(writer, "{}", forest.trees().len())?;
    for tree in forest.trees() {
        write_tree(tree, writer)?;
    }
    Ok(())
}

/// Render a forest to a `String`.
pub fn forest_to_string<T>(forest: &Forest<T>) -> String
where
    T: BinValue + Display,
{
    let mut buffer = Vec::new();
    write_forest(forest, &mut buffer).expect("writing to a Vec cannot fail");
    String::from_utf8(buffer).expect("the format is plain ASCII")
}

// =============================================================================
// Reading
// =============================================================================

/// Strict whitespace tokenizer over the serialized text.
struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self { iter: input.split_whitespace() }
    }

    fn parse<V: FromStr>(&mut self, expected: &'static str) -> Result<V, FormatError> {
        let token = self
            .iter
            .next()
            .ok_or(FormatError::UnexpectedEnd { expected })?;
        token.parse().map_err(|_| FormatError::InvalidToken {
            expected,
            token: token.to_string(),
        })
    }

    fn finish(mut self) -> Result<(), FormatError> {
        match self.iter.next() {
            None => Ok(()),
            Some(token) => Err(FormatError::TrailingData { token: token.to_string() }),
        }
    }
}

fn read_vector_tokens<V: FromStr>(
    tokens: &mut Tokens<'_>,
    expected: &'static str,
) -> Result<Vec<V>, FormatError> {
    let len: usize = tokens.parse(expected)?;
    let mut values = Vec::with_capacity(len.min(1 << 20));
    for _ in 0..len {
        values.push(tokens.parse(expected)?);
    }
    Ok(values)
}

fn read_binning_tokens<T>(tokens: &mut Tokens<'_>) -> Result<FeatureBinning<T>, FormatError>
where
    T: BinValue + FromStr,
{
    let n_levels: u32 = tokens.parse("binning levels")?;
    // Bound the shift below; a 2^30-bin feature is already nonsense.
    if n_levels > 30 {
        return Err(FormatError::InvalidToken {
            expected: "binning levels",
            token: n_levels.to_string(),
        });
    }
    let boundaries: Vec<T> = read_vector_tokens(tokens, "binning boundaries")?;
    let expected = (1usize << n_levels) + 1;
    let got = boundaries.len();
    FeatureBinning::from_raw(n_levels, boundaries).map_err(|_| FormatError::CountMismatch {
        what: "binning boundaries",
        expected,
        got,
    })
}

fn read_cut_tokens(tokens: &mut Tokens<'_>) -> Result<Cut, FormatError> {
    let feature = tokens.parse("cut feature")?;
    let index = tokens.parse("cut index")?;
    let valid: u8 = tokens.parse("cut validity")?;
    if valid > 1 {
        return Err(FormatError::InvalidToken {
            expected: "cut validity",
            token: valid.to_string(),
        });
    }
    let gain = tokens.parse("cut gain")?;
    Ok(Cut { feature, index, gain, valid: valid == 1 })
}

fn read_tree_tokens(tokens: &mut Tokens<'_>) -> Result<Tree, FormatError> {
    let n_cuts: usize = tokens.parse("tree cut count")?;
    let mut cuts = Vec::with_capacity(n_cuts.min(1 << 20));
    for _ in 0..n_cuts {
        cuts.push(read_cut_tokens(tokens)?);
    }
    let purities: Vec<f64> = read_vector_tokens(tokens, "tree purities")?;
    if purities.len() != 2 * n_cuts + 1 {
        return Err(FormatError::CountMismatch {
            what: "tree purities",
            expected: 2 * n_cuts + 1,
            got: purities.len(),
        });
    }
    let boost_weights: Vec<f64> = read_vector_tokens(tokens, "tree boost weights")?;
    if boost_weights.len() != purities.len() {
        return Err(FormatError::CountMismatch {
            what: "tree boost weights",
            expected: purities.len(),
            got: boost_weights.len(),
        });
    }
    Ok(Tree::new(cuts, purities, boost_weights))
}

/// Parse a vector serialized by [`write_vector`].
pub fn read_vector<V: FromStr>(input: &str) -> Result<Vec<V>, FormatError> {
    let mut tokens = Tokens::new(input);
    let values = read_vector_tokens(&mut tokens, "vector")?;
    tokens.finish()?;
    Ok(values)
}

/// Parse a feature binning serialized by [`write_binning`].
pub fn read_binning<T>(input: &str) -> Result<FeatureBinning<T>, FormatError>
where
    T: BinValue + FromStr,
{
    let mut tokens = Tokens::new(input);
    let binning = read_binning_tokens(&mut tokens)?;
    tokens.finish()?;
    Ok(binning)
}

/// Parse a cut serialized by [`write_cut`].
pub fn read_cut(input: &str) -> Result<Cut, FormatError> {
    let mut tokens = Tokens::new(input);
    let cut = read_cut_tokens(&mut tokens)?;
    tokens.finish()?;
    Ok(cut)
}

/// Parse a tree serialized by [`write_tree`].
pub fn read_tree(input: &str) -> Result<Tree, FormatError> {
    let mut tokens = Tokens::new(input);
    let tree = read_tree_tokens(&mut tokens)?;
    tokens.finish()?;
    Ok(tree)
}

/// Parse a forest serialized by [`write_forest`].
pub fn read_forest<T>(input: &str) -> Result<Forest<T>, FormatError>
where
    T: BinValue + FromStr,
{
    let mut tokens = Tokens::new(input);
    let f0 = tokens.parse("forest f0")?;
    let shrinkage = tokens.parse("forest shrinkage")?;
    let n_binnings: usize = tokens.parse("binning count")?;
    let mut binnings = Vec::with_capacity(n_binnings.min(1 << 20));
    for _ in 0..n_binnings {
        binnings.push(read_binning_tokens(&mut tokens)?);
    }
    let n_trees: usize = tokens.parse("tree count")?;
    let mut trees = Vec::with_capacity(n_trees.min(1 << 20));
    for _ in 0..n_trees {
        trees.push(read_tree_tokens(&mut tokens)?);
    }
    tokens.finish()?;
    Ok(Forest::from_parts(f0, shrinkage, binnings, trees))
}
