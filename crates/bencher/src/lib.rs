#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    routes: RouteSet,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, routes: RouteSet) -> Self {
        Self { name, group, routes }
    }

    pub fn small(name: &'static str, routes: RouteSet) -> Self {
        Self::new(name, TestGroup::Small, routes)
    }

    pub fn normal(name: &'static str, routes: RouteSet) -> Self {
        Self::new(name, TestGroup::Normal, routes)
    }

    pub fn large(name: &'static str, routes: RouteSet) -> Self {
        Self::new(name, TestGroup::Large, routes)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn routes(&self) -> &RouteSet {
        &self.routes
    }
}

/// Patterns to register and the paths looked up against them.
#[derive(Debug, Copy, Clone)]
pub struct RouteSet {
    patterns: &'static [&'static str],
    paths: &'static [&'static str],
}

impl RouteSet {
    pub const fn new(patterns: &'static [&'static str], paths: &'static [&'static str]) -> Self {
        Self { patterns, paths }
    }

    pub fn patterns(&self) -> &'static [&'static str] {
        self.patterns
    }

    pub fn paths(&self) -> &'static [&'static str] {
        self.paths
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

pub static STATIC_ROUTES: RouteSet = RouteSet::new(
    &["/", "/cmd.html", "/code.html", "/contrib.html", "/doc/", "/doc/go_faq.html", "/help.html", "/pkg/", "/project/"],
    &["/", "/doc/go_faq.html", "/pkg/", "/project/"],
);

const PARAM_PATTERNS: &[&str] = &[
    "/",
    "/hello/:name",
    "/books/",
    "/books/:isdn",
    "/books/:isdn/reviews/:review",
    "/users/:id",
    "/users/:id/repos",
    "/users/:id/repos/:repo/issues",
    "/files/*filepath",
];

pub static PARAM_ROUTES: RouteSet = RouteSet::new(
    PARAM_PATTERNS,
    &["/hello/john", "/books/978-3-16", "/books/978-3-16/reviews/7", "/users/42/repos/micro/issues", "/files/a/b/c"],
);

pub static MISSES: RouteSet = RouteSet::new(PARAM_PATTERNS, &["/missing", "/books", "/HELLO/john", "/users/42/unknown"]);
