/// Rewrite `\( \)` and `\[ \]` math delimiters to `$` and `$$` outside fenced code
pub fn normalize_math_delimiters(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_fence = false;

    for (i, line) in input.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            out.push_str(line);
            continue;
        }
        if in_fence {
            out.push_str(line);
            continue;
        }
        out.push_str(
            &line
                .replace("\\[", "$$")
                .replace("\\]", "$$")
                .replace("\\(", "$")
                .replace("\\)", "$"),
        );
    }

    out
}

/// Best-effort rendering of LaTeX math as plain Unicode text
pub fn latex_to_unicode(src: &str) -> String {
    let mut scanner = Scanner::new(src);
    scanner.convert_all()
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn convert_all(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '\\' => out.push_str(&self.command()),
                '^' => {
                    let arg = self.argument();
                    out.push_str(&scripted(&arg, '^', superscript));
                }
                '_' => {
                    let arg = self.argument();
                    out.push_str(&scripted(&arg, '_', subscript));
                }
                '{' | '}' => {}
                '~' => out.push(' '),
                other => out.push(other),
            }
        }
        out
    }

    /// Raw text of a braced group, or of the next single token
    fn raw_argument(&mut self) -> String {
        self.skip_spaces();
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                let start = self.pos;
                let mut depth = 1;
                while let Some(c) = self.bump() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                return self.chars[start..self.pos - 1].iter().collect();
                            }
                        }
                        '\\' => {
                            self.bump();
                        }
                        _ => {}
                    }
                }
                self.chars[start..].iter().collect()
            }
            Some('\\') => {
                let start = self.pos;
                self.pos += 1;
                self.read_name();
                if self.pos == start + 1 {
                    self.bump();
                }
                self.chars[start..self.pos].iter().collect()
            }
            Some(_) => self.bump().map(String::from).unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Converted text of the next argument
    fn argument(&mut self) -> String {
        latex_to_unicode(&self.raw_argument())
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    fn command(&mut self) -> String {
        let name = self.read_name();
        if name.is_empty() {
            return match self.bump() {
                Some(',') | Some(';') | Some(':') | Some(' ') => " ".to_string(),
                Some('!') => String::new(),
                Some('\\') => " ".to_string(),
                Some(c) => c.to_string(),
                None => String::new(),
            };
        }

        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.argument();
                let den = self.argument();
                format!("{}/{}", wrap_compound(&num), wrap_compound(&den))
            }
            "sqrt" => {
                let mut root = "√";
                if self.peek() == Some('[') {
                    self.pos += 1;
                    let mut index = String::new();
                    while let Some(c) = self.bump() {
                        if c == ']' {
                            break;
                        }
                        index.push(c);
                    }
                    root = match index.trim() {
                        "3" => "∛",
                        "4" => "∜",
                        _ => "√",
                    };
                }
                let radicand = self.argument();
                format!("{}{}", root, wrap_compound(&radicand))
            }
            "text" | "textrm" | "textbf" | "textit" | "mathrm" | "mathbf" | "mathit" | "mathsf"
            | "mathcal" | "mathbb" | "boldsymbol" | "operatorname" => self.argument(),
            "hat" | "widehat" => format!("{}\u{0302}", self.argument()),
            "bar" | "overline" => format!("{}\u{0304}", self.argument()),
            "vec" => format!("{}\u{20D7}", self.argument()),
            "dot" => format!("{}\u{0307}", self.argument()),
            "tilde" => format!("{}\u{0303}", self.argument()),
            "left" | "right" | "big" | "Big" | "bigg" | "Bigg" => {
                if self.peek() == Some('.') {
                    self.pos += 1;
                }
                String::new()
            }
            "displaystyle" | "limits" | "nolimits" => String::new(),
            other => symbol(other)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    }
}

fn wrap_compound(s: &str) -> String {
    if s.chars().count() <= 1 || s.chars().all(|c| c.is_alphanumeric()) {
        s.to_string()
    } else {
        format!("({})", s)
    }
}

fn scripted(arg: &str, marker: char, map: fn(char) -> Option<char>) -> String {
    let mapped: Option<String> = arg.chars().map(map).collect();
    match mapped {
        Some(s) if !s.is_empty() => s,
        _ if arg.chars().count() <= 1 => format!("{}{}", marker, arg),
        _ => format!("{}({})", marker, arg),
    }
}

fn superscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' => '⁻',
        '=' => '⁼',
        '(' => '⁽',
        ')' => '⁾',
        'a' => 'ᵃ',
        'b' => 'ᵇ',
        'c' => 'ᶜ',
        'd' => 'ᵈ',
        'e' => 'ᵉ',
        'i' => 'ⁱ',
        'k' => 'ᵏ',
        'm' => 'ᵐ',
        'n' => 'ⁿ',
        't' => 'ᵗ',
        'x' => 'ˣ',
        'y' => 'ʸ',
        'T' => 'ᵀ',
        _ => return None,
    })
}

fn subscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        '+' => '₊',
        '-' => '₋',
        '=' => '₌',
        '(' => '₍',
        ')' => '₎',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'i' => 'ᵢ',
        'j' => 'ⱼ',
        'k' => 'ₖ',
        'm' => 'ₘ',
        'n' => 'ₙ',
        'o' => 'ₒ',
        'p' => 'ₚ',
        'r' => 'ᵣ',
        's' => 'ₛ',
        't' => 'ₜ',
        'x' => 'ₓ',
        _ => return None,
    })
}

fn symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        // Greek
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" | "varepsilon" => "ε",
        "zeta" => "ζ",
        "eta" => "η",
        "theta" | "vartheta" => "θ",
        "iota" => "ι",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "xi" => "ξ",
        "pi" => "π",
        "rho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "phi" | "varphi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Xi" => "Ξ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        // Operators
        "sum" => "∑",
        "prod" => "∏",
        "int" => "∫",
        "iint" => "∬",
        "oint" => "∮",
        "partial" => "∂",
        "nabla" => "∇",
        "infty" => "∞",
        "pm" => "±",
        "mp" => "∓",
        "times" => "×",
        "div" => "÷",
        "cdot" => "·",
        "cdots" => "⋯",
        "ldots" | "dots" => "…",
        "circ" => "∘",
        "ast" => "∗",
        // Relations
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "equiv" => "≡",
        "sim" => "∼",
        "simeq" => "≃",
        "propto" => "∝",
        "ll" => "≪",
        "gg" => "≫",
        // Arrows
        "to" | "rightarrow" => "→",
        "leftarrow" | "gets" => "←",
        "Rightarrow" => "⇒",
        "Leftarrow" => "⇐",
        "leftrightarrow" => "↔",
        "Leftrightarrow" => "⇔",
        "implies" => "⟹",
        "iff" => "⟺",
        "mapsto" => "↦",
        // Sets and logic
        "in" => "∈",
        "notin" => "∉",
        "ni" => "∋",
        "subset" => "⊂",
        "subseteq" => "⊆",
        "supset" => "⊃",
        "supseteq" => "⊇",
        "cup" => "∪",
        "cap" => "∩",
        "emptyset" | "varnothing" => "∅",
        "forall" => "∀",
        "exists" => "∃",
        "neg" | "lnot" => "¬",
        "land" | "wedge" => "∧",
        "lor" | "vee" => "∨",
        // Misc
        "angle" => "∠",
        "degree" => "°",
        "hbar" => "ℏ",
        "ell" => "ℓ",
        "Re" => "ℜ",
        "Im" => "ℑ",
        "langle" => "⟨",
        "rangle" => "⟩",
        "lfloor" => "⌊",
        "rfloor" => "⌋",
        "lceil" => "⌈",
        "rceil" => "⌉",
        "prime" => "′",
        "quad" => "  ",
        "qquad" => "    ",
        _ => return None,
    })
}
