//! Default seed data for the filetype registry, grounded on the original
//! application's `constants.py` extension groupings and the
//! `filetypes` Django model fields (`is_image`/`is_archive`/`is_pdf`/
//! `is_movie`/`is_dir`, `generic`, `icon_filename`, `color`).

use super::Filetype;

fn blank(ext: &str) -> Filetype {
    Filetype {
        ext: ext.into(),
        is_image: false,
        is_pdf: false,
        is_movie: false,
        is_archive: false,
        is_dir: false,
        is_text: false,
        is_markdown: false,
        is_html: false,
        is_link: false,
        generic: false,
        mimetype: "application/octet-stream".into(),
        icon_filename: String::new(),
        color: "000000".into(),
        thumbnail: None,
    }
}

fn image(ext: &str, mimetype: &str) -> Filetype {
    Filetype {
        is_image: true,
        mimetype: mimetype.into(),
        color: "4caf50".into(),
        icon_filename: "image.png".into(),
        ..blank(ext)
    }
}

fn archive(ext: &str) -> Filetype {
    Filetype {
        is_archive: true,
        mimetype: "application/zip".into(),
        color: "ff9800".into(),
        icon_filename: "archive.png".into(),
        ..blank(ext)
    }
}

fn movie(ext: &str, mimetype: &str) -> Filetype {
    Filetype {
        is_movie: true,
        mimetype: mimetype.into(),
        color: "2196f3".into(),
        icon_filename: "movie.png".into(),
        ..blank(ext)
    }
}

fn text(ext: &str) -> Filetype {
    Filetype {
        is_text: true,
        mimetype: "text/plain".into(),
        color: "9e9e9e".into(),
        icon_filename: "text.png".into(),
        ..blank(ext)
    }
}

fn html(ext: &str) -> Filetype {
    Filetype {
        is_html: true,
        mimetype: "text/html".into(),
        color: "e91e63".into(),
        icon_filename: "html.png".into(),
        ..blank(ext)
    }
}

/// Default registry seed, grounded on the original application's
/// extension groupings, extended with markdown/pdf/dir entries.
pub fn seed() -> Vec<Filetype> {
    vec![
        archive(".zip"),
        archive(".rar"),
        archive(".cbz"),
        archive(".cbr"),
        html(".htm"),
        html(".html"),
        image(".bmp", "image/bmp"),
        image(".gif", "image/gif"),
        image(".jpg", "image/jpeg"),
        image(".jpeg", "image/jpeg"),
        image(".png", "image/png"),
        image(".webp", "image/webp"),
        text(".txt"),
        Filetype {
            is_markdown: true,
            mimetype: "text/markdown".into(),
            color: "607d8b".into(),
            icon_filename: "markdown.png".into(),
            ..blank(".md")
        },
        Filetype {
            is_markdown: true,
            mimetype: "text/markdown".into(),
            color: "607d8b".into(),
            icon_filename: "markdown.png".into(),
            ..blank(".markdown")
        },
        movie(".mp4", "video/mp4"),
        movie(".m4v", "video/x-m4v"),
        movie(".mpg", "video/mpeg"),
        movie(".mpeg", "video/mpeg"),
        movie(".wmv", "video/x-ms-wmv"),
        movie(".flv", "video/x-flv"),
        movie(".avi", "video/x-msvideo"),
        Filetype {
            is_pdf: true,
            mimetype: "application/pdf".into(),
            color: "f44336".into(),
            icon_filename: "pdf.png".into(),
            ..blank(".pdf")
        },
        Filetype {
            is_dir: true,
            generic: true,
            mimetype: "inode/directory".into(),
            color: "ffc107".into(),
            icon_filename: "folder.png".into(),
            ..blank(".dir")
        },
        Filetype::unknown(),
    ]
}
