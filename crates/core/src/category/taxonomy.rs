//! The universal category taxonomy (Torznab/Newznab standard ids).
//!
//! Top-level categories are multiples of 1000; their children share the same
//! thousand. Ids at or above [`CUSTOM_CATEGORY_OFFSET`] are source-specific and
//! never appear in this table.

/// Offset added to numeric source tokens to expose them as universal ids.
pub const CUSTOM_CATEGORY_OFFSET: u32 = 100_000;

/// A universal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: u32,
    pub name: &'static str,
    pub parent: Option<u32>,
}

const fn top(id: u32, name: &'static str) -> Category {
    Category {
        id,
        name,
        parent: None,
    }
}

const fn sub(id: u32, name: &'static str) -> Category {
    Category {
        id,
        name,
        parent: Some(id / 1000 * 1000),
    }
}

pub const CONSOLE: u32 = 1000;
pub const MOVIES: u32 = 2000;
pub const MOVIES_FOREIGN: u32 = 2010;
pub const MOVIES_OTHER: u32 = 2020;
pub const MOVIES_SD: u32 = 2030;
pub const MOVIES_HD: u32 = 2040;
pub const MOVIES_UHD: u32 = 2045;
pub const MOVIES_BLURAY: u32 = 2050;
pub const MOVIES_3D: u32 = 2060;
pub const MOVIES_DVD: u32 = 2070;
pub const MOVIES_WEBDL: u32 = 2080;
pub const AUDIO: u32 = 3000;
pub const AUDIO_MP3: u32 = 3010;
pub const AUDIO_VIDEO: u32 = 3020;
pub const AUDIO_AUDIOBOOK: u32 = 3030;
pub const AUDIO_LOSSLESS: u32 = 3040;
pub const AUDIO_OTHER: u32 = 3050;
pub const AUDIO_FOREIGN: u32 = 3060;
pub const PC: u32 = 4000;
pub const PC_0DAY: u32 = 4010;
pub const PC_ISO: u32 = 4020;
pub const PC_MAC: u32 = 4030;
pub const PC_MOBILE_OTHER: u32 = 4040;
pub const PC_GAMES: u32 = 4050;
pub const PC_MOBILE_IOS: u32 = 4060;
pub const PC_MOBILE_ANDROID: u32 = 4070;
pub const TV: u32 = 5000;
pub const TV_WEBDL: u32 = 5010;
pub const TV_FOREIGN: u32 = 5020;
pub const TV_SD: u32 = 5030;
pub const TV_HD: u32 = 5040;
pub const TV_UHD: u32 = 5045;
pub const TV_OTHER: u32 = 5050;
pub const TV_SPORT: u32 = 5060;
pub const TV_ANIME: u32 = 5070;
pub const TV_DOCUMENTARY: u32 = 5080;
pub const XXX: u32 = 6000;
pub const BOOKS: u32 = 7000;
pub const BOOKS_MAGS: u32 = 7010;
pub const BOOKS_EBOOK: u32 = 7020;
pub const BOOKS_COMICS: u32 = 7030;
pub const BOOKS_TECHNICAL: u32 = 7040;
pub const BOOKS_OTHER: u32 = 7050;
pub const BOOKS_FOREIGN: u32 = 7060;
pub const OTHER: u32 = 8000;
pub const OTHER_MISC: u32 = 8010;
pub const OTHER_HASHED: u32 = 8020;

/// Every universal category, parents before their children.
pub static ALL: &[Category] = &[
    top(CONSOLE, "Console"),
    sub(1010, "Console/NDS"),
    sub(1020, "Console/PSP"),
    sub(1030, "Console/Wii"),
    sub(1040, "Console/XBox"),
    sub(1050, "Console/XBox 360"),
    sub(1080, "Console/PS3"),
    sub(1090, "Console/Other"),
    sub(1180, "Console/PS4"),
    top(MOVIES, "Movies"),
    sub(MOVIES_FOREIGN, "Movies/Foreign"),
    sub(MOVIES_OTHER, "Movies/Other"),
    sub(MOVIES_SD, "Movies/SD"),
    sub(MOVIES_HD, "Movies/HD"),
    sub(MOVIES_UHD, "Movies/UHD"),
    sub(MOVIES_BLURAY, "Movies/BluRay"),
    sub(MOVIES_3D, "Movies/3D"),
    sub(MOVIES_DVD, "Movies/DVD"),
    sub(MOVIES_WEBDL, "Movies/WEB-DL"),
    top(AUDIO, "Audio"),
    sub(AUDIO_MP3, "Audio/MP3"),
    sub(AUDIO_VIDEO, "Audio/Video"),
    sub(AUDIO_AUDIOBOOK, "Audio/Audiobook"),
    sub(AUDIO_LOSSLESS, "Audio/Lossless"),
    sub(AUDIO_OTHER, "Audio/Other"),
    sub(AUDIO_FOREIGN, "Audio/Foreign"),
    top(PC, "PC"),
    sub(PC_0DAY, "PC/0day"),
    sub(PC_ISO, "PC/ISO"),
    sub(PC_MAC, "PC/Mac"),
    sub(PC_MOBILE_OTHER, "PC/Mobile-Other"),
    sub(PC_GAMES, "PC/Games"),
    sub(PC_MOBILE_IOS, "PC/Mobile-iOS"),
    sub(PC_MOBILE_ANDROID, "PC/Mobile-Android"),
    top(TV, "TV"),
    sub(TV_WEBDL, "TV/WEB-DL"),
    sub(TV_FOREIGN, "TV/Foreign"),
    sub(TV_SD, "TV/SD"),
    sub(TV_HD, "TV/HD"),
    sub(TV_UHD, "TV/UHD"),
    sub(TV_OTHER, "TV/Other"),
    sub(TV_SPORT, "TV/Sport"),
    sub(TV_ANIME, "TV/Anime"),
    sub(TV_DOCUMENTARY, "TV/Documentary"),
    top(XXX, "XXX"),
    top(BOOKS, "Books"),
    sub(BOOKS_MAGS, "Books/Mags"),
    sub(BOOKS_EBOOK, "Books/EBook"),
    sub(BOOKS_COMICS, "Books/Comics"),
    sub(BOOKS_TECHNICAL, "Books/Technical"),
    sub(BOOKS_OTHER, "Books/Other"),
    sub(BOOKS_FOREIGN, "Books/Foreign"),
    top(OTHER, "Other"),
    sub(OTHER_MISC, "Other/Misc"),
    sub(OTHER_HASHED, "Other/Hashed"),
];

/// Look up a universal category by id.
pub fn lookup(id: u32) -> Option<&'static Category> {
    ALL.iter().find(|c| c.id == id)
}

/// Parent of a child category, `None` for top-level or unknown ids.
pub fn parent_of(id: u32) -> Option<u32> {
    lookup(id).and_then(|c| c.parent)
}

/// Children of a top-level category (empty for children and unknown ids).
pub fn children_of(id: u32) -> impl Iterator<Item = u32> {
    ALL.iter()
        .filter(move |c| c.parent == Some(id))
        .map(|c| c.id)
}

/// Whether `id` lives in the source-specific range.
pub fn is_custom(id: u32) -> bool {
    id >= CUSTOM_CATEGORY_OFFSET
}

/// Display name for a universal id.
pub fn name(id: u32) -> Option<&'static str> {
    lookup(id).map(|c| c.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_point_at_their_thousand() {
        for cat in ALL {
            if let Some(parent) = cat.parent {
                assert_eq!(parent, cat.id / 1000 * 1000, "bad parent for {}", cat.name);
                assert!(lookup(parent).is_some());
            }
        }
    }

    #[test]
    fn test_parent_and_children() {
        assert_eq!(parent_of(MOVIES_HD), Some(MOVIES));
        assert_eq!(parent_of(MOVIES), None);
        let children: Vec<u32> = children_of(AUDIO).collect();
        assert!(children.contains(&AUDIO_LOSSLESS));
        assert!(!children.contains(&AUDIO));
        assert_eq!(children_of(AUDIO_MP3).count(), 0);
    }

    #[test]
    fn test_custom_range() {
        assert!(is_custom(100_042));
        assert!(!is_custom(TV_ANIME));
        assert_eq!(name(TV_ANIME), Some("TV/Anime"));
        assert_eq!(name(123), None);
    }
}
