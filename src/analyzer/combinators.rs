use super::core::ParseError;
use super::core::ParseResult;
use super::core::Parser;
use std::fmt;
use std::marker::PhantomData;

/// Matches one item equal to `value`.
#[derive(Clone)]
pub struct Equal<I> {
    value: I,
}

impl<I> Equal<I> {
    pub fn new(value: I) -> Self {
        Self { value }
    }
}

impl<I: Clone + PartialEq + fmt::Debug> Parser<I, I> for Equal<I> {
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<I> {
        let found = input.get(pos).ok_or(ParseError::EOF)?;
        if *found == self.value {
            Ok((pos + 1, found.clone()))
        } else {
            Err(ParseError::ParseError {
                message: format!("expected {:?}", self.value),
                found: format!("{:?}", found),
                position: pos,
            })
        }
    }
}

/// Matches one item for which `f` returns a value.
#[derive(Clone)]
pub struct Satisfy<I, O, F> {
    f: F,
    _phantom: PhantomData<(I, O)>,
}

impl<I, O, F> Satisfy<I, O, F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, F> Parser<I, O> for Satisfy<I, O, F>
where
    I: fmt::Debug,
    F: Fn(&I) -> Option<O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        let found = input.get(pos).ok_or(ParseError::EOF)?;
        match (self.f)(found) {
            Some(result) => Ok((pos + 1, result)),
            None => Err(ParseError::ParseError {
                message: "predicate not satisfied".to_string(),
                found: format!("{:?}", found),
                position: pos,
            }),
        }
    }
}

pub struct Choice<I, O> {
    parsers: Vec<Box<dyn Parser<I, O>>>,
}

impl<I, O> Choice<I, O> {
    pub fn new(parsers: Vec<Box<dyn Parser<I, O>>>) -> Self {
        Self { parsers }
    }
}

impl<I, O> Parser<I, O> for Choice<I, O> {
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        for parser in &self.parsers {
            if let Ok(result) = parser.parse(input, pos) {
                return Ok(result);
            }
        }
        Err(ParseError::NoAlternative)
    }
}

#[derive(Clone)]
pub struct Preceded<P1, P2, I, O> {
    parser1: P1,
    parser2: P2,
    _phantom: PhantomData<(I, O)>,
}

impl<P1, P2, I, O> Preceded<P1, P2, I, O> {
    pub fn new(parser1: P1, parser2: P2) -> Self {
        Self {
            parser1,
            parser2,
            _phantom: PhantomData,
        }
    }
}

impl<P1, P2, I, O> Parser<I, O> for Preceded<P1, P2, I, O>
where
    P1: Parser<I, ()>,
    P2: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        let (pos, _) = self.parser1.parse(input, pos)?;
        self.parser2.parse(input, pos)
    }
}

/// Like [`Preceded`], but absent when the lead does not match. Once the
/// lead matches, the rest is required.
#[derive(Clone)]
pub struct Committed<P1, P2, I, O> {
    lead: P1,
    parser: P2,
    _phantom: PhantomData<(I, O)>,
}

impl<P1, P2, I, O> Committed<P1, P2, I, O> {
    pub fn new(lead: P1, parser: P2) -> Self {
        Self {
            lead,
            parser,
            _phantom: PhantomData,
        }
    }
}

impl<P1, P2, I, O> Parser<I, Option<O>> for Committed<P1, P2, I, O>
where
    P1: Parser<I, ()>,
    P2: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<Option<O>> {
        let Ok((pos, _)) = self.lead.parse(input, pos) else {
            return Ok((pos, None));
        };
        let (pos, value) = self.parser.parse(input, pos)?;
        Ok((pos, Some(value)))
    }
}

pub struct Map<P, F, A, B> {
    parser: P,
    f: F,
    _phantom: PhantomData<(A, B)>,
}

impl<P, F, A, B> Map<P, F, A, B> {
    pub fn new(parser: P, f: F) -> Self {
        Self {
            parser,
            f,
            _phantom: PhantomData,
        }
    }
}

impl<I, A, B, P, F> Parser<I, B> for Map<P, F, A, B>
where
    P: Parser<I, A>,
    F: Fn(A) -> B,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<B> {
        self.parser
            .parse(input, pos)
            .map(|(pos, value)| (pos, (self.f)(value)))
    }
}

#[derive(Clone)]
pub struct AsUnit<P, O> {
    parser: P,
    _phantom: PhantomData<O>,
}

impl<P, O> AsUnit<P, O> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, P> Parser<I, ()> for AsUnit<P, O>
where
    P: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<()> {
        self.parser.parse(input, pos).map(|(pos, _)| (pos, ()))
    }
}

#[derive(Clone)]
pub struct Optional<P, I, O> {
    parser: P,
    _phantom: PhantomData<(I, O)>,
}

impl<P, I, O> Optional<P, I, O> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, P> Parser<I, Option<O>> for Optional<P, I, O>
where
    P: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<Option<O>> {
        match self.parser.parse(input, pos) {
            Ok((new_pos, value)) => Ok((new_pos, Some(value))),
            Err(_) => Ok((pos, None)),
        }
    }
}

#[derive(Clone)]
pub struct Tuple2<P1, P2, I, O1, O2> {
    parser1: P1,
    parser2: P2,
    _phantom: PhantomData<(I, O1, O2)>,
}

impl<P1, P2, I, O1, O2> Tuple2<P1, P2, I, O1, O2> {
    pub fn new(parser1: P1, parser2: P2) -> Self {
        Self {
            parser1,
            parser2,
            _phantom: PhantomData,
        }
    }
}

impl<P1, P2, I, O1, O2> Parser<I, (O1, O2)> for Tuple2<P1, P2, I, O1, O2>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<(O1, O2)> {
        let (pos, o1) = self.parser1.parse(input, pos)?;
        let (pos, o2) = self.parser2.parse(input, pos)?;
        Ok((pos, (o1, o2)))
    }
}

#[derive(Clone)]
pub struct Tuple3<P1, P2, P3, I, O1, O2, O3> {
    parser1: P1,
    parser2: P2,
    parser3: P3,
    _phantom: PhantomData<(I, O1, O2, O3)>,
}

impl<P1, P2, P3, I, O1, O2, O3> Tuple3<P1, P2, P3, I, O1, O2, O3> {
    pub fn new(parser1: P1, parser2: P2, parser3: P3) -> Self {
        Self {
            parser1,
            parser2,
            parser3,
            _phantom: PhantomData,
        }
    }
}

impl<P1, P2, P3, I, O1, O2, O3> Parser<I, (O1, O2, O3)> for Tuple3<P1, P2, P3, I, O1, O2, O3>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
    P3: Parser<I, O3>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<(O1, O2, O3)> {
        let (pos, o1) = self.parser1.parse(input, pos)?;
        let (pos, o2) = self.parser2.parse(input, pos)?;
        let (pos, o3) = self.parser3.parse(input, pos)?;
        Ok((pos, (o1, o2, o3)))
    }
}

#[derive(Clone)]
pub struct WithContext<P, C> {
    parser: P,
    context: C,
}

impl<P, C> WithContext<P, C> {
    pub fn new(parser: P, context: C) -> Self {
        Self { parser, context }
    }
}

impl<I, O, P, C: ToString> Parser<I, O> for WithContext<P, C>
where
    P: Parser<I, O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        self.parser
            .parse(input, pos)
            .map_err(|e| ParseError::WithContext {
                message: self.context.to_string(),
                inner: Box::new(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::prelude::*;
    use pretty_assertions::assert_eq;

    fn digit() -> impl Parser<char, u32> {
        satisfy(|c: &char| c.to_digit(10))
    }

    #[test]
    fn test_equal_reports_position() {
        let input: Vec<char> = "ab".chars().collect();
        assert_eq!(equal('a').parse(&input, 0), Ok((1, 'a')));
        let err = equal('a').parse(&input, 1).unwrap_err();
        assert_eq!(err.position(), Some(1));
        assert_eq!(equal('a').parse(&input, 2), Err(ParseError::EOF));
    }

    #[test]
    fn test_tuple_and_map() {
        let input: Vec<char> = "4+2".chars().collect();
        let sum = map(tuple3(digit(), equal('+'), digit()), |(a, _, b): (u32, char, u32)| a + b);
        assert_eq!(sum.parse(&input, 0), Ok((3, 6)));
    }

    #[test]
    fn test_optional_and_committed() {
        let input: Vec<char> = ",x".chars().collect();
        let tail = committed(as_unit(equal(',')), digit());
        assert_eq!(optional(digit()).parse(&input, 0), Ok((0, None)));
        assert_eq!(tail.parse(&input, 1), Ok((1, None)));
        // the comma commits, so a missing digit is an error
        assert_eq!(tail.parse(&input, 0).unwrap_err().position(), Some(1));
    }

    #[test]
    fn test_outermost_context_wins() {
        let input: Vec<char> = "a?".chars().collect();
        let grammar = with_context(
            preceded(as_unit(equal('a')), with_context(digit(), "a digit")),
            "pair",
        );
        let err = grammar.parse(&input, 0).unwrap_err();
        assert_eq!(err.context(), Some("pair"));
        assert_eq!(err.position(), Some(1));
    }

    #[test]
    fn test_choice_takes_first_match() {
        let input: Vec<char> = "x".chars().collect();
        let grammar = choice(vec![
            Box::new(map(digit(), |d: u32| d.to_string())),
            Box::new(map(equal('x'), |c: char| c.to_string())),
        ]);
        assert_eq!(grammar.parse(&input, 0), Ok((1, "x".to_string())));
        assert_eq!(grammar.parse(&input, 1), Err(ParseError::NoAlternative));
    }
}
