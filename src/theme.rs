use ratatui::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Default,
    Nord,
    Gruvbox,
    Mono,
}

pub struct ThemeColors {
    pub bg: Color,
    pub border: Color,
    pub text_primary: Color,
    pub text_dim: Color,
    pub accent_primary: Color,
    pub status_success: Color,
    pub status_error: Color,
    pub status_pending: Color,
}

impl Theme {
    pub fn all() -> &'static [Theme] {
        &[Theme::Default, Theme::Nord, Theme::Gruvbox, Theme::Mono]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Default => "Default",
            Theme::Nord => "Nord",
            Theme::Gruvbox => "Gruvbox",
            Theme::Mono => "Mono",
        }
    }

    pub fn from_name(name: &str) -> Option<Theme> {
        Self::all().iter().copied().find(|t| t.name() == name)
    }

    pub fn from_index(i: usize) -> Option<Theme> {
        Self::all().get(i).copied()
    }

    pub fn as_index(&self) -> usize {
        Self::all().iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn get_colors(&self) -> ThemeColors {
        match self {
            Theme::Default => ThemeColors {
                bg: Color::Rgb(13, 17, 23),
                border: Color::Rgb(48, 54, 61),
                text_primary: Color::Rgb(230, 237, 243),
                text_dim: Color::Rgb(125, 133, 144),
                accent_primary: Color::Rgb(88, 166, 255),
                status_success: Color::Rgb(63, 185, 80),
                status_error: Color::Rgb(248, 81, 73),
                status_pending: Color::Rgb(210, 153, 34),
            },
            Theme::Nord => ThemeColors {
                bg: Color::Rgb(46, 52, 64),
                border: Color::Rgb(76, 86, 106),
                text_primary: Color::Rgb(236, 239, 244),
                text_dim: Color::Rgb(160, 168, 183),
                accent_primary: Color::Rgb(136, 192, 208),
                status_success: Color::Rgb(163, 190, 140),
                status_error: Color::Rgb(191, 97, 106),
                status_pending: Color::Rgb(235, 203, 139),
            },
            Theme::Gruvbox => ThemeColors {
                bg: Color::Rgb(40, 40, 40),
                border: Color::Rgb(80, 73, 69),
                text_primary: Color::Rgb(235, 219, 178),
                text_dim: Color::Rgb(168, 153, 132),
                accent_primary: Color::Rgb(131, 165, 152),
                status_success: Color::Rgb(184, 187, 38),
                status_error: Color::Rgb(251, 73, 52),
                status_pending: Color::Rgb(250, 189, 47),
            },
            Theme::Mono => ThemeColors {
                bg: Color::Black,
                border: Color::DarkGray,
                text_primary: Color::White,
                text_dim: Color::Gray,
                accent_primary: Color::White,
                status_success: Color::White,
                status_error: Color::White,
                status_pending: Color::Gray,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_indices_agree() {
        for (i, theme) in Theme::all().iter().enumerate() {
            assert_eq!(Theme::from_name(theme.name()), Some(*theme));
            assert_eq!(Theme::from_index(i), Some(*theme));
            assert_eq!(theme.as_index(), i);
        }
        assert_eq!(Theme::from_name("Solarized"), None);
    }
}
