//! Built-in experiment templates.
//!
//! Each template pairs the variables an editor exposes with the default
//! options its UI constructor expects. Reducing the variables against the
//! defaults yields a ready-to-use options object.

use serde_json::{Value, json};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{ExpkitError, Result};
use crate::variable::{Variable, VariableList};

/// Built-in experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Template {
    #[strum(serialize = "popup")]
    Popup,
    #[strum(serialize = "exit-intent-popup")]
    ExitIntentPopup,
    #[strum(serialize = "homepage-takeover")]
    HomepageTakeover,
}

impl Template {
    /// Look up a template by its command-line name
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| {
            let known: Vec<String> = Self::iter().map(|t| t.to_string()).collect();
            ExpkitError::template(format!(
                "unknown template '{}' (expected one of: {})",
                name,
                known.join(", ")
            ))
        })
    }

    /// Human-readable experiment name
    pub fn title(&self) -> &'static str {
        match self {
            Self::Popup => "Popup",
            Self::ExitIntentPopup => "Exit Intent Popup",
            Self::HomepageTakeover => "Homepage Takeover",
        }
    }

    /// Variables the experiment exposes, with their default values
    pub fn variables(&self) -> VariableList {
        match self {
            Self::Popup => popup_variables(),
            Self::ExitIntentPopup => {
                let mut list = popup_variables();
                list.extend([Variable::leaf(
                    "Exit Intent Delay Seconds",
                    "exitIntentDelaySeconds",
                    "number",
                    0,
                )
                .with_unit("seconds")
                .with_description(
                    "The delay in seconds before the exit intent popup is shown. This is useful to prevent showing the popup immediately when the user moves their mouse towards the top of the screen.",
                )]);
                list
            }
            Self::HomepageTakeover => homepage_takeover_variables(),
        }
    }

    /// Options object the experiment's constructor starts from
    pub fn default_config(&self) -> Value {
        match self {
            Self::Popup => popup_defaults(),
            Self::ExitIntentPopup => {
                let mut defaults = popup_defaults();
                defaults["exitIntentDelaySeconds"] = json!(0);
                defaults
            }
            Self::HomepageTakeover => json!({
                "buttonTextHTML": "Go Back",
                "href": "javascript:void(0)",
                "design": {
                    "top": "1rem",
                    "left": "1rem",
                    "color": "#fff",
                    "backgroundColor": "#007bff",
                    "border": "none",
                    "borderRadius": "1rem",
                    "padding": "0.5rem 1rem"
                }
            })
        }
    }

    /// Reduce this template's own variables against its defaults
    pub fn build_config(&self) -> Value {
        self.variables().to_config(&self.default_config())
    }
}

fn popup_defaults() -> Value {
    json!({
        "id": chrono::Utc::now().timestamp_millis(),
        "content": {
            "headingHTML": "",
            "bodyHTML": "",
            "footerHTML": ""
        },
        "actions": [
            {
                "textHTML": "Yes, I agree!",
                "href": "https://donate.example.com/?src=popup"
            },
            {
                "textHTML": "No, I do not agree.",
                "href": "javascript:void(0)"
            }
        ],
        "design": {
            "width": 640,
            "popupBackdrop": "rgba(0 0 0 / 5%)",
            "popupForegroundColor": "black",
            "popupBackgroundColor": "white",
            "popupBorder": "none",
            "popupBorderAlternate": "none",
            "popupBorderRadius": "1rem",
            "popupButtonForegroundColor": "black",
            "popupButtonBackgroundColor": "#f5c635",
            "popupButtonBorder": "none",
            "popupButtonForegroundColor2": "white",
            "popupButtonBackgroundColor2": "black",
            "popupButtonBorder2": "none"
        },
        "open": false
    })
}

fn popup_action(number: u32, text: &str, href: &str) -> Variable {
    let index = number - 1;
    Variable::group(
        format!("Popup Action {}", number),
        vec![
            Variable::leaf(
                format!("Popup Action {} Text", number),
                format!("actions[{}].textHTML", index),
                "text",
                text,
            )
            .at_index(0),
            Variable::leaf(
                format!("Popup Action {} Action", number),
                format!("actions[{}].href", index),
                "text:url",
                href,
            )
            .at_index(1),
        ],
    )
    .at_index(index)
}

fn popup_variables() -> VariableList {
    VariableList::new(vec![
        Variable::leaf(
            "Popup Heading HTML",
            "content.headingHTML",
            "text:long",
            "<h3>This is the heading HTML</h3>",
        ),
        Variable::leaf(
            "Popup Body HTML",
            "content.bodyHTML",
            "text:long",
            "<p>Lorem ipsum dolor sit amet, consectetur adipiscing elit.</p>",
        ),
        Variable::leaf(
            "Popup Footer HTML",
            "content.footerHTML",
            "text:long",
            "<p>This is the footer HTML</p>",
        ),
        Variable::group(
            "Popup Actions",
            vec![
                popup_action(1, "Yes, I agree!", "https://donate.example.com/?src=popup"),
                popup_action(2, "No, I do not agree.", "javascript:void(0)"),
            ],
        ),
        Variable::leaf("Popup Width", "design.width", "number", 640).with_unit("px"),
        Variable::leaf(
            "Popup Backdrop Color",
            "design.popupBackdrop",
            "text",
            "rgba(0 0 0 / 5%)",
        )
        .with_unit("color"),
        Variable::leaf(
            "Popup Foreground Color",
            "design.popupForegroundColor",
            "text",
            "black",
        )
        .with_unit("color"),
        Variable::leaf(
            "Popup Background Color",
            "design.popupBackgroundColor",
            "text",
            "white",
        )
        .with_unit("color"),
        Variable::leaf("Popup Border Color", "design.popupBorder", "text", "none"),
        Variable::leaf(
            "Popup Border Alternate Color",
            "design.popupBorderAlternate",
            "text",
            "none",
        ),
        Variable::leaf("Popup Border Radius", "design.popupBorderRadius", "number", 1)
            .with_unit("rem"),
        Variable::leaf(
            "Popup Button Foreground Color (CTA)",
            "design.popupButtonForegroundColor",
            "text",
            "black",
        )
        .with_unit("color"),
        Variable::leaf(
            "Popup Button Background Color (CTA)",
            "design.popupButtonBackgroundColor",
            "text",
            "#f5c635",
        )
        .with_unit("color"),
        Variable::leaf(
            "Popup Button Border (CTA)",
            "design.popupButtonBorder",
            "text",
            "none",
        )
        .with_unit("color"),
        Variable::leaf(
            "Popup Button Foreground Color (Other)",
            "design.popupButtonForegroundColor2",
            "text",
            "white",
        )
        .with_unit("color"),
        Variable::leaf(
            "Popup Button Background Color (Other)",
            "design.popupButtonBackgroundColor2",
            "text",
            "#000000",
        )
        .with_unit("color"),
        Variable::leaf(
            "Popup Button Border (Other)",
            "design.popupButtonBorder2",
            "text",
            "#000000",
        ),
    ])
}

fn homepage_takeover_variables() -> VariableList {
    let design = |index: u32, name: &str, maps_to: &str, type_name: &str, value: Value| {
        Variable::leaf(name, maps_to, type_name, value).at_index(index)
    };

    VariableList::new(vec![
        Variable::leaf("Homepage URL", "homepageUrl", "text:url", "https://nextafter.com/")
            .with_description("The URL of the homepage where the redirect will occur."),
        Variable::leaf(
            "Destination URL",
            "destinationUrl",
            "text:url",
            "https://nextafter.com/",
        )
        .with_description("The URL to which the user will be redirected."),
        Variable::leaf("src Param Value", "srcParamValue", "text", "redirect").with_description(
            "The value of the src parameter to be added to the destination URL.",
        ),
        Variable::leaf("Redirect Cooldown Days", "redirectCooldownDays", "number", 7)
            .with_description("The number of days to wait before redirecting the user again."),
        Variable::leaf(
            "Cookie Name",
            "cookieName",
            "text",
            "homepageTakeoverRedirected",
        )
        .with_description("The name of the cookie to be set for the redirect."),
        Variable::leaf("Button Text HTML", "buttonTextHTML", "text:rich", "Go Back")
            .with_description(
                "The text to be displayed on the back button on the redirected page.",
            ),
        Variable::group(
            "Design",
            vec![
                design(0, "Button Position Top", "design.top", "text", json!(16))
                    .with_unit("px"),
                design(1, "Button Position Left", "design.left", "text", json!(16))
                    .with_unit("px"),
                design(
                    2,
                    "Button Background Color",
                    "design.backgroundColor",
                    "text:color",
                    json!("#000000"),
                ),
                design(
                    3,
                    "Button Text Color",
                    "design.color",
                    "text:color",
                    json!("#FFFFFF"),
                ),
                design(
                    4,
                    "Button Border Radius",
                    "design.borderRadius",
                    "number",
                    json!(4),
                )
                .with_unit("px"),
                design(5, "Button Padding", "design.padding", "text", json!("8px 16px")),
            ],
        )
        .with_type("group:collapsed"),
    ])
}
