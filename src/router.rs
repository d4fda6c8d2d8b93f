//! Longest-registered-prefix path router.
//!
//! Grounded on `original_source/src/http_router.h` (`HttpPathNode<T>` /
//! `HttpRouter<T>`): `insert` walks/creates a segment trie, `search`
//! descends while segments match and stops on the first miss, returning the
//! handler of the deepest node actually reached (or none if that node is
//! still the untouched root). The original stores borrowed raw `T*`
//! pointers; this redesign has nodes own `Arc<dyn Handler<S>>` instead,
//! the "safer redesign" spec.md §9 calls out, since registration happens
//! once before `run` and `Arc` cloning there costs nothing.

use crate::server::Handler;
use crate::ConnectionData;
use std::{collections::HashMap, sync::Arc};

/// Error returned by [`Router::insert`] for a malformed registration path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RouterError {
    /// Path does not start with `/`.
    MissingLeadingSlash,
    /// Path contains the literal substring `..`.
    DotDotSegment,
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingLeadingSlash => write!(f, "path should start with '/'"),
            Self::DotDotSegment => write!(f, "path is invalid"),
        }
    }
}

struct PathNode<S: ConnectionData> {
    handler: Option<Arc<dyn Handler<S>>>,
    children: HashMap<String, PathNode<S>>,
}

impl<S: ConnectionData> PathNode<S> {
    fn new() -> Self {
        Self {
            handler: None,
            children: HashMap::new(),
        }
    }
}

/// A trie of URL path segments mapping to registered handlers.
///
/// Keys are exact, case-sensitive segment strings; there is no wildcard or
/// path-parameter support (spec.md's explicit non-goal). Percent-decoding is
/// never applied to routing: two requests differing only in encoding route
/// to the same handler only if their *raw* segments are byte-identical.
pub(crate) struct Router<S: ConnectionData> {
    root: PathNode<S>,
}

/// Splits a path into non-empty segments, exactly as
/// `original_source`'s `urls::segments_view` does: repeated or trailing `/`
/// simply produce no segment for that position.
pub(crate) fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl<S: ConnectionData> Router<S> {
    pub(crate) fn new() -> Self {
        Self {
            root: PathNode::new(),
        }
    }

    /// Registers `handler` at `path`. `path` must be non-empty and begin
    /// with `/`, and must not contain the literal substring `..`. A
    /// trailing `/` is ignored (`/hello/` and `/hello` register the same
    /// node). Registering the same path again overwrites the previous
    /// handler (last writer wins).
    pub(crate) fn insert(
        &mut self,
        path: &str,
        handler: Arc<dyn Handler<S>>,
    ) -> Result<(), RouterError> {
        if !path.starts_with('/') {
            return Err(RouterError::MissingLeadingSlash);
        }
        if path.contains("..") {
            return Err(RouterError::DotDotSegment);
        }

        let segments = split_segments(path);
        if segments.is_empty() {
            self.root.handler = Some(handler);
            return Ok(());
        }

        let mut node = &mut self.root;
        for segment in segments {
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(PathNode::new);
        }
        node.handler = Some(handler);

        Ok(())
    }

    /// Resolves `segments` to the longest-registered-prefix handler.
    ///
    /// Descends from the root while each successive segment matches a
    /// child key exactly, stopping at the first miss. Returns the handler
    /// of the deepest node actually reached; if that node is still the
    /// root (no segment matched, including the empty-path case), returns
    /// the root's own handler if any, or `None`.
    pub(crate) fn search(&self, segments: &[&[u8]]) -> Option<Arc<dyn Handler<S>>> {
        let mut node = &self.root;

        for segment in segments {
            let Ok(key) = std::str::from_utf8(segment) else {
                break;
            };
            match node.children.get(key) {
                Some(child) => node = child,
                None => break,
            }
        }

        node.handler.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{async_trait, response::HttpResponse, writer::HttpResponseWriter, HttpRequest};

    struct Tag;

    #[async_trait]
    impl Handler<()> for Tag {
        async fn handle(&self, _: &mut (), _: HttpRequest, writer: HttpResponseWriter) {
            writer.send(HttpResponse::new(crate::StatusCode::Ok, Vec::new(), "text/plain"));
        }
    }

    fn tag() -> Arc<dyn Handler<()>> {
        Arc::new(Tag)
    }

    fn segs(p: &str) -> Vec<Vec<u8>> {
        split_segments(p).into_iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    fn as_refs(v: &[Vec<u8>]) -> Vec<&[u8]> {
        v.iter().map(|s| s.as_slice()).collect()
    }

    #[test]
    fn literal_scenario_from_spec() {
        let mut router: Router<()> = Router::new();
        let root = tag();
        let hello = tag();
        let hello_test = tag();
        let hello_test_abc = tag();

        router.insert("/", root.clone()).unwrap();
        router.insert("/hello", hello.clone()).unwrap();
        router.insert("/hello/test", hello_test.clone()).unwrap();
        router.insert("/hello/test/abc/", hello_test_abc).unwrap();

        assert!(router.insert("/..", tag()).is_err());
        assert!(router.insert("/../abc", tag()).is_err());
        assert!(router.insert("abc", tag()).is_err());

        let s = segs("/hello/abc/def");
        assert!(Arc::ptr_eq(&router.search(&as_refs(&s)).unwrap(), &hello));

        let s = segs("/hello/test/");
        assert!(Arc::ptr_eq(&router.search(&as_refs(&s)).unwrap(), &hello_test));

        let s = segs("/he");
        assert!(router.search(&as_refs(&s)).is_none());

        assert!(Arc::ptr_eq(&router.search(&[]).unwrap(), &root));
        let s = segs("/");
        assert!(Arc::ptr_eq(&router.search(&as_refs(&s)).unwrap(), &root));
    }

    #[test]
    fn last_writer_wins() {
        let mut router: Router<()> = Router::new();
        let first = tag();
        let second = tag();
        router.insert("/hello", first).unwrap();
        router.insert("/hello", second.clone()).unwrap();

        let s: Vec<&[u8]> = vec![b"hello"];
        assert!(Arc::ptr_eq(&router.search(&s).unwrap(), &second));
    }
}
