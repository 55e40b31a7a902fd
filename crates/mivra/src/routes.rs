//! Web routes.

use mivra_router::Router;

/// Registers every route the site serves.
///
/// Actions are `Controller@method` descriptors and middleware is referenced
/// by alias, so the resulting table can be written to the route cache.
pub fn web(router: &mut Router) {
    router.get("/", "HomeController@index").name("home");
    router.get("/contact", "ContactController@show").name("contact.show");
    router
        .post("/contact", "ContactController@submit")
        .middleware_alias("log")
        .name("contact.submit");
}
