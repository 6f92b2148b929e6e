//! This file defines the templates and a convenience function for creating the navigation bar.

use maud::{Markup, html};

use crate::endpoints;

/// Template for a link in the navigation bar.
///
/// It will change appearance if `is_current` is set to
/// `true`. Only one link should be set as active at any one time.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white lg:dark:hover:bg-transparent"
        };

        html!( a href=(self.url) class=(style) aria-current=[self.is_current.then_some("page")] { (self.title) } )
    }
}

pub struct NavBar<'a> {
    project_name: &'a str,
    links: Vec<Link<'a>>,
}

impl<'a> NavBar<'a> {
    /// Get the navigation bar.
    ///
    /// If a link matches `active_endpoint`, then that link will be
    /// marked as active and displayed differently in the HTML.
    /// The admin link is only shown when `is_admin` is `true`.
    pub fn new(active_endpoint: &str, project_name: &'a str, is_admin: bool) -> NavBar<'a> {
        let mut pages = vec![
            (endpoints::HOME, "Home"),
            (endpoints::REPORT, "Report"),
            (endpoints::SETTINGS, "Settings"),
        ];

        if is_admin {
            pages.push((endpoints::ADMIN, "Admin"));
        }

        let mut links: Vec<Link<'a>> = pages
            .into_iter()
            .map(|(url, title)| Link {
                url,
                title,
                is_current: active_endpoint == url,
            })
            .collect();

        links.push(Link {
            url: endpoints::LOG_OUT,
            title: "Log out",
            is_current: false,
        });

        NavBar {
            project_name,
            links,
        }
    }

    pub fn into_html(self) -> Markup {
        // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href=(endpoints::HOME)
                        class="flex items-center space-x-3 rtl:space-x-reverse"
                    {
                        span
                            class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "🪙 " (self.project_name)
                        }
                    }

                    ul
                        class="font-medium flex flex-row p-0 space-x-8 rtl:space-x-reverse
                        bg-white dark:bg-gray-900"
                    {
                        @for link in self.links {
                            li { (link.into_html()) }
                        }
                    }
                }
            }
        )
    }
}

#[cfg(test)]
mod nav_bar_tests {
    use std::collections::HashMap;

    use crate::{endpoints, navigation::NavBar};

    #[test]
    fn set_active_endpoint() {
        let mut cases = HashMap::new();
        cases.insert(endpoints::HOME, true);
        cases.insert(endpoints::REPORT, true);
        cases.insert(endpoints::SETTINGS, true);
        cases.insert(endpoints::ADMIN, true);

        cases.insert(endpoints::LOG_IN, false);
        cases.insert(endpoints::LOG_OUT, false);
        cases.insert(endpoints::ADD_EXPENSE, false);
        cases.insert(endpoints::ADMIN_BACKUP, false);

        for (endpoint, should_be_active) in cases {
            let nav_bar = NavBar::new(endpoint, "Project", true);

            assert_link_active(nav_bar, endpoint, should_be_active);
        }
    }

    #[test]
    fn admin_link_hidden_for_regular_users() {
        let nav_bar = NavBar::new(endpoints::HOME, "Project", false);

        assert!(nav_bar.links.iter().all(|link| link.url != endpoints::ADMIN));
    }

    #[test]
    fn admin_link_shown_for_admins() {
        let nav_bar = NavBar::new(endpoints::HOME, "Project", true);

        assert!(nav_bar.links.iter().any(|link| link.url == endpoints::ADMIN));
    }

    #[track_caller]
    fn assert_link_active(nav_bar: NavBar<'_>, endpoint: &str, should_be_active: bool) {
        let get_active_string = |is_active: bool| -> &str {
            if is_active {
                "active (true)"
            } else {
                "inactive (false)"
            }
        };

        for link in nav_bar.links {
            if link.url == endpoint {
                assert_eq!(
                    link.is_current,
                    should_be_active,
                    "Link for current page should be {} but got {}",
                    get_active_string(should_be_active),
                    get_active_string(link.is_current),
                )
            } else {
                assert!(
                    !link.is_current,
                    "Link for inactive page should {} but got {}",
                    get_active_string(false),
                    get_active_string(link.is_current)
                )
            }
        }
    }
}
