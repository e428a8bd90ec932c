//! Character codes and classification predicates shared by the expression
//! lexer and the identifier validator.

pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const LF: char = '\n';
pub const VTAB: char = '\x0B';
pub const FF: char = '\x0C';
pub const CR: char = '\r';
pub const SPACE: char = ' ';
pub const NBSP: char = '\u{00A0}';

pub const BANG: char = '!';
pub const DQ: char = '"';
pub const HASH: char = '#';
pub const DOLLAR: char = '$';
pub const PERCENT: char = '%';
pub const AMPERSAND: char = '&';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const COMMA: char = ',';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const SEMICOLON: char = ';';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';
pub const QUESTION: char = '?';

pub const LBRACKET: char = '[';
pub const BACKSLASH: char = '\\';
pub const RBRACKET: char = ']';
pub const CARET: char = '^';
pub const UNDERSCORE: char = '_';
pub const BT: char = '`';

pub const LBRACE: char = '{';
pub const BAR: char = '|';
pub const RBRACE: char = '}';

pub fn is_whitespace(code: char) -> bool {
    (TAB..=SPACE).contains(&code) || code == NBSP
}

pub fn is_digit(code: char) -> bool {
    code.is_ascii_digit()
}

pub fn is_ascii_letter(code: char) -> bool {
    code.is_ascii_alphabetic()
}

pub fn is_ascii_hex_digit(code: char) -> bool {
    code.is_ascii_hexdigit()
}

pub fn is_quote(code: char) -> bool {
    code == SQ || code == DQ || code == BT
}

/// `[A-Za-z_$]`
pub fn is_identifier_start(code: char) -> bool {
    is_ascii_letter(code) || code == UNDERSCORE || code == DOLLAR
}

/// `[A-Za-z0-9_$]`
pub fn is_identifier_part(code: char) -> bool {
    is_identifier_start(code) || is_digit(code)
}

pub fn is_exponent_start(code: char) -> bool {
    code == 'e' || code == 'E'
}

pub fn is_exponent_sign(code: char) -> bool {
    code == MINUS || code == PLUS
}

/// Map the character after a backslash to the character it stands for.
pub fn unescape(code: char) -> char {
    match code {
        'n' => LF,
        'f' => FF,
        'r' => CR,
        't' => TAB,
        'v' => VTAB,
        other => other,
    }
}
